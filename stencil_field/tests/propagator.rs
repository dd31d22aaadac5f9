use glam::{Mat4, Quat, Vec3};
use stencil_field::{
    primitives, Bounds, BuildState, ComputeBackend, CpuBackend, FieldConfig, FieldError,
    FieldResult, FieldSample, JumpFloodParams, MeshSnapshot, Propagator, SeedCell, Topology,
    VolumeCells,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cube() -> MeshSnapshot {
    let (vertices, indices) = primitives::cuboid(Vec3::splat(0.5));
    MeshSnapshot::new(&vertices, Topology::TriangleList(Some(indices.as_slice())))
}

fn sphere() -> MeshSnapshot {
    let (vertices, indices) = primitives::uv_sphere(0.5, 24, 12);
    MeshSnapshot::new(&vertices, Topology::TriangleList(Some(indices.as_slice())))
}

fn cube_propagator<B: ComputeBackend>(backend: B) -> Propagator<B> {
    let config = FieldConfig::default()
        .with_grid_size([32; 3])
        .with_threshold(0.05);
    let mut propagator = Propagator::new(backend, config);
    propagator.initialize().unwrap();
    propagator
}

fn field_bounds() -> Bounds {
    Bounds::new(Vec3::splat(-2.5), Vec3::splat(2.5))
}

fn run_until<B: ComputeBackend>(propagator: &mut Propagator<B>, target: BuildState) {
    for _ in 0..100_000 {
        if propagator.poll() == target {
            return;
        }
        std::thread::yield_now();
    }
    panic!("propagator never reached {target:?}");
}

#[test]
fn test_cube_end_to_end() {
    init_logger();
    let mut propagator = cube_propagator(CpuBackend::new());
    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    run_until(&mut propagator, BuildState::Stable);

    let cell_size = 5.0 / 32.0;
    let on_surface = propagator.sample(Vec3::new(0.5, 0.0, 0.0)).distance().unwrap();
    assert!(on_surface < cell_size, "{on_surface}");

    let far = propagator.sample(Vec3::new(2.0, 0.0, 0.0)).distance().unwrap();
    assert!((far - 1.5).abs() < cell_size, "{far}");

    let normal = propagator.estimate_normal(Vec3::new(1.5, 0.0, 0.0));
    assert!(normal.dot(Vec3::X) > 0.9, "{normal}");
}

#[test]
fn test_bounds_rejection() {
    init_logger();
    let mut propagator = cube_propagator(CpuBackend::new());
    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    run_until(&mut propagator, BuildState::Stable);

    for p in [
        Vec3::new(2.6, 0.0, 0.0),
        Vec3::new(0.0, -3.0, 0.0),
        Vec3::new(0.0, 0.0, 100.0),
        Vec3::splat(f32::NAN),
    ] {
        assert_eq!(propagator.sample(p), FieldSample::OutsideBounds, "{p}");
    }
    // the bounds are inclusive.
    assert!(propagator.sample(Vec3::splat(2.5)).is_hit());
}

#[test]
fn test_idempotent_rebuild() {
    init_logger();
    let probes = [
        Vec3::ZERO,
        Vec3::new(0.5, 0.0, 0.0),
        Vec3::new(1.2, -0.7, 0.3),
        Vec3::new(-2.0, 2.0, -2.0),
        Vec3::new(0.1, 0.45, -0.45),
    ];

    let mut propagator = cube_propagator(CpuBackend::new());
    let mut runs = vec![];
    for _ in 0..2 {
        propagator
            .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
            .unwrap();
        run_until(&mut propagator, BuildState::Stable);
        runs.push(
            probes
                .iter()
                .map(|p| propagator.sample(*p).distance().unwrap())
                .collect::<Vec<_>>(),
        );
    }

    for (first, second) in runs[0].iter().zip(&runs[1]) {
        float_cmp::assert_approx_eq!(f32, *first, *second, ulps = 2);
    }
}

#[test]
fn test_cancel_and_restart() {
    init_logger();
    let mut propagator = cube_propagator(CpuBackend::new());
    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    run_until(&mut propagator, BuildState::Propagating);
    assert_eq!(propagator.sample(Vec3::ZERO), FieldSample::NotReady);

    // restart mid propagation with a sphere moved along x.
    let transform = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    propagator
        .rebuild_for_mesh(sphere(), transform, field_bounds())
        .unwrap();
    assert_eq!(propagator.state(), BuildState::Voxelizing);
    assert_eq!(propagator.sample(Vec3::ZERO), FieldSample::NotReady);
    run_until(&mut propagator, BuildState::Stable);

    // only the sphere is seen: its center is 0.5 away from its surface.
    let center = propagator.sample(Vec3::new(1.0, 0.0, 0.0)).distance().unwrap();
    assert!((center - 0.5).abs() < 5.0 / 32.0, "{center}");

    // the field bounds move with the transform.
    assert!(propagator.sample(Vec3::new(3.4, 0.0, 0.0)).is_hit());
    assert_eq!(
        propagator.sample(Vec3::new(-1.6, 0.0, 0.0)),
        FieldSample::OutsideBounds
    );
}

#[test]
fn test_restart_during_voxelization() {
    init_logger();
    let mut propagator = cube_propagator(CpuBackend::new());
    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    assert_eq!(propagator.state(), BuildState::Voxelizing);

    // the cube job keeps running in the background, its seeds must never be published.
    let transform = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    propagator
        .rebuild_for_mesh(sphere(), transform, field_bounds())
        .unwrap();
    assert_eq!(propagator.state(), BuildState::Voxelizing);
    run_until(&mut propagator, BuildState::Stable);

    let cell_size = 5.0 / 32.0;
    let center = propagator.sample(Vec3::new(1.0, 0.0, 0.0)).distance().unwrap();
    assert!((center - 0.5).abs() < cell_size, "{center}");

    // the cube face at x = -0.5 is not part of the field.
    let cube_face = propagator.sample(Vec3::new(-0.5, 0.0, 0.0)).distance().unwrap();
    assert!((cube_face - 1.0).abs() < cell_size, "{cube_face}");

    assert!(propagator.sample(Vec3::new(3.4, 0.0, 0.0)).is_hit());
    assert_eq!(
        propagator.sample(Vec3::new(-1.6, 0.0, 0.0)),
        FieldSample::OutsideBounds
    );
}

#[test]
fn test_rebuild_while_stable_drops_field() {
    init_logger();
    let mut propagator = cube_propagator(CpuBackend::new());
    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    run_until(&mut propagator, BuildState::Stable);
    let field = propagator.field().unwrap();

    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    assert!(!propagator.is_ready());
    assert_eq!(propagator.sample(Vec3::ZERO), FieldSample::NotReady);

    // readers holding the previous field can keep using it.
    assert!(field.sample(Vec3::ZERO).is_hit());
}

#[test]
fn test_empty_mesh() {
    init_logger();
    let mut propagator = cube_propagator(CpuBackend::new());
    propagator
        .rebuild_for_mesh(MeshSnapshot::default(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    run_until(&mut propagator, BuildState::Stable);

    assert!(propagator.is_ready());
    assert_eq!(propagator.field().unwrap().seed_count(), 0);
    assert_eq!(propagator.sample(Vec3::ZERO), FieldSample::NoSurface);
    assert_eq!(
        propagator.sample(Vec3::splat(10.0)),
        FieldSample::OutsideBounds
    );
    assert_eq!(propagator.estimate_normal(Vec3::ZERO), Vec3::Y);
}

#[test]
fn test_rotated_field() {
    init_logger();
    let config = FieldConfig::default()
        .with_grid_size([16; 3])
        .with_threshold(0.1);
    let mut propagator = Propagator::new(CpuBackend::new(), config);
    propagator.initialize().unwrap();

    let transform = Mat4::from_scale_rotation_translation(
        Vec3::splat(2.0),
        Quat::from_rotation_z(core::f32::consts::FRAC_PI_4),
        Vec3::new(0.0, 0.0, 5.0),
    );
    propagator
        .rebuild_for_mesh(cube(), transform, Bounds::new(Vec3::splat(-1.0), Vec3::ONE))
        .unwrap();
    run_until(&mut propagator, BuildState::Stable);

    // the scaled cube face sits 1.0 away from its center in world space.
    let face_direction = Quat::from_rotation_z(core::f32::consts::FRAC_PI_4) * Vec3::X;
    let probe = Vec3::new(0.0, 0.0, 5.0) + face_direction * 1.6;
    let distance = propagator.sample(probe).distance().unwrap();
    assert!((distance - 0.6).abs() < 0.25, "{distance}");
}

/// Wraps the CPU backend and fails the `n`-th dispatch.
#[derive(Debug)]
struct FailingBackend {
    inner: CpuBackend,
    fail_at: usize,
    released: usize,
}

impl ComputeBackend for FailingBackend {
    type Volume = <CpuBackend as ComputeBackend>::Volume;
    type Readback = <CpuBackend as ComputeBackend>::Readback;

    fn create_volume(&mut self, grid_size: [usize; 3]) -> FieldResult<Self::Volume> {
        self.inner.create_volume(grid_size)
    }

    fn clear_volume(&mut self, volume: &mut Self::Volume) -> FieldResult<()> {
        self.inner.clear_volume(volume)
    }

    fn upload_volume(&mut self, volume: &mut Self::Volume, cells: &[SeedCell]) -> FieldResult<()> {
        self.inner.upload_volume(volume, cells)
    }

    fn dispatch_jump_flood(
        &mut self,
        src: &Self::Volume,
        dst: &mut Self::Volume,
        params: &JumpFloodParams,
    ) -> FieldResult<()> {
        if self.inner.dispatch_count() + 1 == self.fail_at {
            return Err(FieldError::Backend("device lost".to_owned()));
        }
        self.inner.dispatch_jump_flood(src, dst, params)
    }

    fn request_readback(&mut self, volume: &Self::Volume) -> FieldResult<Self::Readback> {
        self.inner.request_readback(volume)
    }

    fn poll_readback(
        &mut self,
        readback: &mut Self::Readback,
    ) -> Option<FieldResult<VolumeCells>> {
        self.inner.poll_readback(readback)
    }

    fn release_volume(&mut self, volume: Self::Volume) {
        self.released += 1;
        self.inner.release_volume(volume);
    }
}

#[test]
fn test_backend_failure_returns_to_idle() {
    init_logger();
    let backend = FailingBackend {
        inner: CpuBackend::new(),
        fail_at: 3,
        released: 0,
    };
    let mut propagator = cube_propagator(backend);
    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    run_until(&mut propagator, BuildState::Propagating);

    let mut states = vec![];
    for _ in 0..10 {
        states.push(propagator.poll());
    }
    assert_eq!(states[0], BuildState::Propagating);
    assert_eq!(states[1], BuildState::Idle);
    assert!(states.iter().skip(1).all(|state| *state == BuildState::Idle));
    assert_eq!(propagator.sample(Vec3::ZERO), FieldSample::NotReady);
    assert_eq!(propagator.backend().released, 2);

    // the propagator stays usable.
    propagator.backend_mut().fail_at = usize::MAX;
    propagator
        .rebuild_for_mesh(cube(), Mat4::IDENTITY, field_bounds())
        .unwrap();
    run_until(&mut propagator, BuildState::Stable);
    assert!(propagator.sample(Vec3::ZERO).is_hit());
}
