//! Headless demo: builds the field of a cube on the GPU and prints a few probes.
use anyhow::Result;
use glam::{Mat4, Vec3};
use itertools::Itertools;
use stencil_field::{
    primitives, Bounds, BuildState, FieldConfig, FieldSample, MeshSnapshot, Propagator,
    SurfaceQuery, Topology,
};
use stencil_field_wgpu::WgpuBackend;

/// Upper bound on the ticks a build may take before the demo gives up.
const MAX_TICKS: usize = 100_000;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let backend = pollster::block_on(WgpuBackend::new())?;

    let (vertices, indices) = primitives::cuboid(Vec3::splat(0.5));
    let mesh = MeshSnapshot::new(&vertices, Topology::TriangleList(Some(indices.as_slice())));

    let config = FieldConfig::default()
        .with_grid_size([32; 3])
        .with_threshold(0.05);
    let mut propagator = Propagator::new(backend, config);
    propagator.initialize()?;
    propagator.rebuild_for_mesh(
        mesh,
        Mat4::IDENTITY,
        Bounds::new(Vec3::splat(-2.5), Vec3::splat(2.5)),
    )?;

    let mut ticks = 0;
    let mut last_state = BuildState::Idle;
    loop {
        let state = propagator.poll();
        ticks += 1;
        if state != last_state {
            log::info!("[demo] tick {ticks}: {state:?}");
            last_state = state;
        }
        match state {
            BuildState::Stable => break,
            BuildState::Idle => anyhow::bail!("build failed, see the logs above"),
            BuildState::Voxelizing | BuildState::Seeding | BuildState::Propagating => {}
        }
        if ticks > MAX_TICKS {
            anyhow::bail!("build did not complete after {MAX_TICKS} ticks");
        }
        std::thread::yield_now();
    }

    let probes = [0.0, 0.5, 1.0, 2.0, 3.0]
        .into_iter()
        .map(|x| Vec3::new(x, 0.0, 0.0))
        .chain([Vec3::new(1.0, 1.0, 1.0), Vec3::new(-2.0, 0.3, 1.2)])
        .collect_vec();

    for probe in probes {
        match propagator.sample(probe) {
            FieldSample::Hit { distance, nearest } => {
                let snapped = propagator.closest_point_on_surface(probe);
                println!(
                    "{probe}: distance {distance:.4}, nearest seed {nearest}, snapped to {:?}",
                    snapped.map(|point| point.position)
                );
            }
            sample => println!("{probe}: {sample:?}"),
        }
    }

    propagator.release();
    Ok(())
}
