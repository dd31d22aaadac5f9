//! Ping-pong volumes of one build and the published field.
use std::sync::Arc;

use crate::{
    ComputeBackend, DistanceField, FieldError, FieldResult, Grid, JumpFloodParams, SeedGrid,
    VolumeCells,
};

/// Owns the two propagation volumes of a build plus the published stable field.
///
/// The backend is borrowed per call: the store only holds handles.
/// Volumes must be given back with [`FieldStore::release`].
pub struct FieldStore<B: ComputeBackend> {
    grid: Grid,
    volumes: [B::Volume; 2],
    /// Volume holding the output of the last completed step.
    front: usize,
    readback: Option<B::Readback>,
    stable: Option<Arc<DistanceField>>,
}

impl<B: ComputeBackend> FieldStore<B> {
    /// Allocate both volumes for `grid`, every cell empty.
    pub fn allocate(backend: &mut B, grid: Grid) -> FieldResult<Self> {
        crate::config::validate_grid_size(grid.get_cell_count())?;

        let mut first = backend.create_volume(grid.get_cell_count())?;
        let mut second = match backend.create_volume(grid.get_cell_count()) {
            Ok(volume) => volume,
            Err(err) => {
                backend.release_volume(first);
                return Err(err);
            }
        };

        let cleared = backend
            .clear_volume(&mut first)
            .and_then(|()| backend.clear_volume(&mut second));
        if let Err(err) = cleared {
            backend.release_volume(first);
            backend.release_volume(second);
            return Err(err);
        }

        Ok(Self {
            grid,
            volumes: [first, second],
            front: 0,
            readback: None,
            stable: None,
        })
    }

    /// Grid of the volumes.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Copy the voxelizer seeds into the front volume.
    pub fn upload_seeds(&mut self, backend: &mut B, seeds: &SeedGrid) -> FieldResult<()> {
        if seeds.grid() != &self.grid {
            return Err(FieldError::SizeMismatch {
                expected: self.grid.get_total_cell_count(),
                found: seeds.cells().len(),
            });
        }
        self.front = 0;
        backend.upload_volume(&mut self.volumes[0], seeds.cells())
    }

    /// Dispatch one step from the front volume into the back one, then swap them.
    pub fn jump_flood_step(&mut self, backend: &mut B, step: usize) -> FieldResult<()> {
        let params = JumpFloodParams::new(&self.grid, step);
        let [first, second] = &mut self.volumes;
        let (src, dst) = if self.front == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        };
        backend.dispatch_jump_flood(src, dst, &params)?;
        self.front = 1 - self.front;
        Ok(())
    }

    /// Start reading the front volume back. Replaces any pending readback.
    pub fn request_readback(&mut self, backend: &mut B) -> FieldResult<()> {
        self.readback = Some(backend.request_readback(&self.volumes[self.front])?);
        Ok(())
    }

    /// Check on the pending readback, `None` while in flight or if none was requested.
    pub fn poll_readback(&mut self, backend: &mut B) -> Option<FieldResult<VolumeCells>> {
        let readback = self.readback.as_mut()?;
        let result = backend.poll_readback(readback);
        if result.is_some() {
            self.readback = None;
        }
        result
    }

    /// Make `field` the stable field. Readers holding the previous one keep it alive.
    pub fn publish(&mut self, field: DistanceField) -> Arc<DistanceField> {
        let field = Arc::new(field);
        self.stable = Some(Arc::clone(&field));
        field
    }

    /// The published field, if any.
    pub const fn stable(&self) -> Option<&Arc<DistanceField>> {
        self.stable.as_ref()
    }

    /// Drop the pending readback and the stable field, then free both volumes.
    pub fn release(self, backend: &mut B) {
        let Self {
            volumes, readback, ..
        } = self;
        drop(readback);
        let [first, second] = volumes;
        backend.release_volume(first);
        backend.release_volume(second);
    }
}

impl<B: ComputeBackend> core::fmt::Debug for FieldStore<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FieldStore")
            .field("grid", &self.grid)
            .field("front", &self.front)
            .field("readback_pending", &self.readback.is_some())
            .field("published", &self.stable.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{voxelizer, Bounds, CpuBackend, MeshSnapshot, SampleMode, Topology};
    use glam::{Mat4, Vec3};

    #[test]
    fn test_store_pass() {
        let mut backend = CpuBackend::new();
        let grid = Grid::from_bounds(Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0)), [8; 3]);
        let mesh = MeshSnapshot::new(
            &[[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]],
            Topology::TriangleList::<u32>(None),
        );
        let seeds = voxelizer::voxelize(&mesh, &grid, 0.3, crate::VoxelizeMethod::BruteForce);
        assert!(seeds.seed_count() > 0);

        let mut store = FieldStore::allocate(&mut backend, grid.clone()).unwrap();
        assert!(store.poll_readback(&mut backend).is_none());
        store.upload_seeds(&mut backend, &seeds).unwrap();
        for step in crate::jump_flood::step_sequence(grid.get_cell_count()) {
            store.jump_flood_step(&mut backend, step).unwrap();
        }
        assert_eq!(backend.dispatch_count(), 3);

        store.request_readback(&mut backend).unwrap();
        let cells = store.poll_readback(&mut backend).unwrap().unwrap();
        assert!(cells.iter().all(crate::SeedCell::is_seeded));

        let field = store.publish(DistanceField::new(
            grid,
            Mat4::IDENTITY,
            cells,
            SampleMode::Nearest,
        ));
        assert!(Arc::ptr_eq(&field, store.stable().unwrap()));
        store.release(&mut backend);
        // readers keep the field alive after the release.
        assert!(field.sample(Vec3::ZERO).is_hit());
    }

    #[test]
    fn test_upload_wrong_grid() {
        let mut backend = CpuBackend::new();
        let grid = Grid::from_bounds(Bounds::new(Vec3::ZERO, Vec3::ONE), [4; 3]);
        let other = Grid::from_bounds(Bounds::new(Vec3::ZERO, Vec3::ONE), [2; 3]);
        let seeds = voxelizer::voxelize(
            &MeshSnapshot::default(),
            &other,
            0.1,
            crate::VoxelizeMethod::BruteForce,
        );
        let mut store = FieldStore::allocate(&mut backend, grid).unwrap();
        assert!(matches!(
            store.upload_seeds(&mut backend, &seeds),
            Err(FieldError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_sized_grid() {
        let mut backend = CpuBackend::new();
        let grid = Grid::from_bounds(Bounds::new(Vec3::ZERO, Vec3::ONE), [4, 0, 4]);
        assert_eq!(
            FieldStore::allocate(&mut backend, grid).err(),
            Some(FieldError::ZeroSizedGrid([4, 0, 4]))
        );
    }
}
