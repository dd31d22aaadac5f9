//! Real-time distance fields for surface snapping guides.
//!
//! Two independent paths answer "how far is this point from the guide surface":
//!
//! - [`Propagator`] builds a voxel distance field for an arbitrary mesh: the mesh is voxelized
//!   into seed cells on the rayon pool, then a jump flood pass propagates the nearest seed of
//!   every cell, one step per tick, on a pluggable [`ComputeBackend`].
//!   Distances are computed at query time from the recorded seed positions.
//! - [`StencilUnion`] evaluates closed form distance functions of primitive guide shapes
//!   (spheres, ellipsoids, boxes, capsules) and returns their minimum.
//!
//! ```
//! use glam::{Mat4, Vec3};
//! use stencil_field::{
//!     primitives, Bounds, BuildState, CpuBackend, FieldConfig, MeshSnapshot, Propagator,
//!     Topology,
//! };
//!
//! let (vertices, indices) = primitives::cuboid(Vec3::splat(0.5));
//! let mesh = MeshSnapshot::new(&vertices, Topology::TriangleList(Some(indices.as_slice())));
//!
//! let config = FieldConfig::default().with_grid_size([16; 3]).with_threshold(0.1);
//! let mut propagator = Propagator::new(CpuBackend::new(), config);
//! propagator.initialize()?;
//! let bounds = Bounds::new(Vec3::splat(-1.0), Vec3::ONE);
//! propagator.rebuild_for_mesh(mesh, Mat4::IDENTITY, bounds)?;
//!
//! // once per frame.
//! while propagator.poll() != BuildState::Stable {}
//!
//! let distance = propagator.sample(Vec3::new(0.9, 0.0, 0.0)).distance();
//! assert!(distance.is_some());
//! # Ok::<(), stencil_field::FieldError>(())
//! ```
//!
//! Queries never fail: they return a [`FieldSample`] sentinel while the field is being
//! built, outside of its bounds, or when the mesh left no seed.
//!
//! ## Mesh input
//!
//! Vertices can be any type implementing [`Point`]: `[f32; 3]`, `glam::Vec3`, `glam::Vec3A`,
//! or `mint::Point3<f32>` with the `mint` feature. Indices are `u16` or `u32`, described by a
//! [`Topology`].
//!
//! ## Features
//!
//! - `serde`: serialize configurations, bounds, grids and shape descriptors.
//! - `mint`: `Point` implementations for `mint` types.

mod analytic;
mod backend;
mod config;
mod error;
mod geo;
mod gradient;
mod grid;
mod jump_flood;
mod mesh;
mod mesh_collider;
mod point;
mod propagator;
mod query;
mod stencil;
mod store;
mod surface;
mod volume;
mod voxelizer;

pub mod preview;
pub mod primitives;

pub use analytic::{sd_box, sd_capsule, sd_ellipsoid, sd_sphere};
pub use backend::{ComputeBackend, CpuBackend, CpuReadback, CpuVolume, VolumeCells};
pub use config::{FieldConfig, SampleMode, VoxelizeMethod};
pub use error::{FieldError, FieldResult};
pub use geo::{
    closest_point_on_segment, closest_point_on_triangle, point_segment_distance,
    point_triangle_distance,
};
pub use gradient::FALLBACK_NORMAL;
pub use grid::{Bounds, Grid, SnapResult};
pub use jump_flood::{
    initial_step, iteration_count, jump_flood, jump_flood_step, step_sequence, JumpFloodParams,
};
pub use mesh::{MeshSnapshot, Topology};
pub use mesh_collider::TriangleMeshCollider;
pub use point::Point;
pub use propagator::{BuildState, Propagator};
pub use query::{DistanceField, FieldSample};
pub use stencil::{
    collider_distance, Collider, GuideRegistry, GuideShape, ShapeDescriptor, ShapeKind,
    StencilUnion, DEFAULT_NORMAL_EPSILON,
};
pub use store::FieldStore;
pub use surface::{SurfacePoint, SurfaceQuery};
pub use volume::SeedCell;
pub use voxelizer::{voxelize, SeedGrid, VoxelJob};
