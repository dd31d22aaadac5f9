//! Build configuration of a distance field.

use crate::{FieldError, FieldResult};

/// How the voxelizer finds the cells close to the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VoxelizeMethod {
    /// Every cell is tested against every triangle, in parallel over the cells.
    /// Cost is `cells * triangles`, only worth it for tiny meshes.
    BruteForce,
    /// Triangles are processed in parallel and only visit the cells of their bounding box
    /// grown by the threshold. Produces the same seeds as `BruteForce`.
    #[default]
    TriangleBounds,
}

/// How a published field turns recorded seeds into a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleMode {
    /// Distance to the seed recorded by the cell containing the point.
    #[default]
    Nearest,
    /// Minimum distance to the seeds recorded by the 2x2x2 cells surrounding the point.
    /// Smoother across cell boundaries, 8 lookups instead of 1.
    Neighborhood,
}

/// Configuration of a [`crate::Propagator`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldConfig {
    /// Number of cells on each axis.
    pub grid_size: [usize; 3],
    /// Cells whose center is closer than this to the mesh become seeds.
    /// Expressed in mesh local units.
    pub threshold: f32,
    /// Voxelization strategy.
    pub voxelize_method: VoxelizeMethod,
    /// Sampling strategy of the published field.
    pub sample_mode: SampleMode,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            grid_size: [64, 64, 64],
            threshold: 0.5,
            voxelize_method: VoxelizeMethod::default(),
            sample_mode: SampleMode::default(),
        }
    }
}

impl FieldConfig {
    /// Set the number of cells on each axis.
    #[must_use]
    pub fn with_grid_size(mut self, grid_size: [usize; 3]) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Set the voxelization threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the voxelization strategy.
    #[must_use]
    pub fn with_voxelize_method(mut self, voxelize_method: VoxelizeMethod) -> Self {
        self.voxelize_method = voxelize_method;
        self
    }

    /// Set the sampling strategy.
    #[must_use]
    pub fn with_sample_mode(mut self, sample_mode: SampleMode) -> Self {
        self.sample_mode = sample_mode;
        self
    }

    /// Check the configuration can be used to allocate a field.
    pub fn validate(&self) -> FieldResult<()> {
        validate_grid_size(self.grid_size)?;
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(FieldError::InvalidThreshold(self.threshold.to_string()));
        }
        Ok(())
    }
}

/// Reject grids with a zero dimension.
pub fn validate_grid_size(grid_size: [usize; 3]) -> FieldResult<()> {
    if grid_size.contains(&0) {
        Err(FieldError::ZeroSizedGrid(grid_size))
    } else {
        Ok(())
    }
}
