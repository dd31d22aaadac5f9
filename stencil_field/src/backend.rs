//! Compute backend seam and its CPU implementation.
use std::sync::Arc;

use crate::{jump_flood, FieldError, FieldResult, JumpFloodParams, SeedCell};

/// Cells of a volume once read back on the CPU.
pub type VolumeCells = Arc<Vec<SeedCell>>;

/// Compute API used by the field store.
///
/// Volumes are opaque handles: GPU buffers, host arrays. Dispatches may complete
/// asynchronously, their results are only observed through a readback that is polled
/// on a later tick.
pub trait ComputeBackend {
    /// Handle to one volume of `SeedCell`s.
    type Volume;
    /// Handle to an in-flight readback.
    type Readback;

    /// Allocate a volume of `grid_size` cells. Content is unspecified until cleared or uploaded.
    fn create_volume(&mut self, grid_size: [usize; 3]) -> FieldResult<Self::Volume>;

    /// Mark every cell of the volume as empty.
    fn clear_volume(&mut self, volume: &mut Self::Volume) -> FieldResult<()>;

    /// Copy host cells into the volume.
    fn upload_volume(&mut self, volume: &mut Self::Volume, cells: &[SeedCell]) -> FieldResult<()>;

    /// Dispatch one jump flood step reading `src` and writing `dst`.
    fn dispatch_jump_flood(
        &mut self,
        src: &Self::Volume,
        dst: &mut Self::Volume,
        params: &JumpFloodParams,
    ) -> FieldResult<()>;

    /// Start copying a volume back to the host.
    fn request_readback(&mut self, volume: &Self::Volume) -> FieldResult<Self::Readback>;

    /// Check on a readback. Never blocks, returns `None` while the data is in flight.
    fn poll_readback(&mut self, readback: &mut Self::Readback)
        -> Option<FieldResult<VolumeCells>>;

    /// Free a volume.
    fn release_volume(&mut self, volume: Self::Volume);
}

/// Host volume of the CPU backend.
#[derive(Debug, Clone)]
pub struct CpuVolume {
    size: [usize; 3],
    cells: VolumeCells,
}

impl CpuVolume {
    /// Number of cells on each axis.
    pub const fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Current content.
    pub fn cells(&self) -> &[SeedCell] {
        &self.cells
    }
}

/// Readback of the CPU backend, optionally delayed by a number of polls.
#[derive(Debug)]
pub struct CpuReadback {
    cells: VolumeCells,
    remaining_polls: usize,
}

/// Runs the jump flood kernels on the rayon thread pool.
///
/// Dispatches execute immediately. Readbacks are available on the first poll unless
/// a latency is configured with [`CpuBackend::with_readback_latency`].
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    readback_latency: usize,
    dispatch_count: usize,
}

impl CpuBackend {
    /// Create a CPU backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make readbacks report `None` for `polls` polls before delivering.
    #[must_use]
    pub const fn with_readback_latency(mut self, polls: usize) -> Self {
        self.readback_latency = polls;
        self
    }

    /// Number of jump flood steps dispatched since creation.
    pub const fn dispatch_count(&self) -> usize {
        self.dispatch_count
    }
}

impl ComputeBackend for CpuBackend {
    type Volume = CpuVolume;
    type Readback = CpuReadback;

    fn create_volume(&mut self, grid_size: [usize; 3]) -> FieldResult<Self::Volume> {
        crate::config::validate_grid_size(grid_size)?;
        let count = grid_size[0] * grid_size[1] * grid_size[2];
        Ok(CpuVolume {
            size: grid_size,
            cells: Arc::new(vec![SeedCell::EMPTY; count]),
        })
    }

    fn clear_volume(&mut self, volume: &mut Self::Volume) -> FieldResult<()> {
        Arc::make_mut(&mut volume.cells).fill(SeedCell::EMPTY);
        Ok(())
    }

    fn upload_volume(&mut self, volume: &mut Self::Volume, cells: &[SeedCell]) -> FieldResult<()> {
        if volume.cells.len() != cells.len() {
            return Err(FieldError::SizeMismatch {
                expected: volume.cells.len(),
                found: cells.len(),
            });
        }
        Arc::make_mut(&mut volume.cells).copy_from_slice(cells);
        Ok(())
    }

    fn dispatch_jump_flood(
        &mut self,
        src: &Self::Volume,
        dst: &mut Self::Volume,
        params: &JumpFloodParams,
    ) -> FieldResult<()> {
        if src.size != dst.size || params.size.map(|s| s as usize) != src.size {
            return Err(FieldError::SizeMismatch {
                expected: src.cells.len(),
                found: dst.cells.len(),
            });
        }
        // a published readback may still share the destination, make_mut detaches it.
        jump_flood::jump_flood_step(
            &src.cells,
            Arc::make_mut(&mut dst.cells).as_mut_slice(),
            params,
        );
        self.dispatch_count += 1;
        Ok(())
    }

    fn request_readback(&mut self, volume: &Self::Volume) -> FieldResult<Self::Readback> {
        Ok(CpuReadback {
            cells: Arc::clone(&volume.cells),
            remaining_polls: self.readback_latency,
        })
    }

    fn poll_readback(
        &mut self,
        readback: &mut Self::Readback,
    ) -> Option<FieldResult<VolumeCells>> {
        if readback.remaining_polls > 0 {
            readback.remaining_polls -= 1;
            return None;
        }
        Some(Ok(Arc::clone(&readback.cells)))
    }

    fn release_volume(&mut self, volume: Self::Volume) {
        drop(volume);
    }
}
