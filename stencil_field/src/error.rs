//! Error types for field set-up and compute backends.

use thiserror::Error;

/// Result type for field set-up operations.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised while configuring the field or talking to the compute backend.
///
/// Queries never return these: they report a [`crate::FieldSample`] sentinel instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// One of the grid dimensions is zero.
    #[error("grid size {0:?} has a zero dimension")]
    ZeroSizedGrid([usize; 3]),

    /// Bounds are not finite or have a non positive size on one axis.
    #[error("bounds are empty or not finite")]
    InvalidBounds,

    /// The voxelization threshold is negative or not finite.
    #[error("invalid voxelization threshold: {0}")]
    InvalidThreshold(String),

    /// The propagator was used before `initialize` succeeded.
    #[error("distance field is not initialized")]
    NotInitialized,

    /// The compute backend failed.
    #[error("compute backend error: {0}")]
    Backend(String),

    /// The local to world transform cannot be inverted.
    #[error("local to world transform is not invertible")]
    SingularTransform,

    /// A volume upload does not match the allocated volume.
    #[error("volume size mismatch: expected {expected} cells, got {found}")]
    SizeMismatch {
        /// Cells in the allocated volume.
        expected: usize,
        /// Cells provided.
        found: usize,
    },
}
