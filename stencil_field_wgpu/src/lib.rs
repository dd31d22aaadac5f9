//! [`wgpu`] compute backend for [`stencil_field`].
//!
//! [`WgpuBackend`] implements [`stencil_field::ComputeBackend`] with two WGSL kernels,
//! `clear_volume.wgsl` and `jump_flood.wgsl`, embedded with `rust-embed`.
//! Volumes are storage buffers of `vec4<f32>` matching [`stencil_field::SeedCell`].
//!
//! ```no_run
//! use stencil_field::{FieldConfig, Propagator};
//! use stencil_field_wgpu::WgpuBackend;
//!
//! let backend = pollster::block_on(WgpuBackend::new())?;
//! let mut propagator = Propagator::new(backend, FieldConfig::default());
//! propagator.initialize()?;
//! # Ok::<(), stencil_field::FieldError>(())
//! ```

mod backend;
mod shader_builder;

pub use backend::{WgpuBackend, WgpuReadback, WgpuVolume};
pub use shader_builder::ShaderBuilder;
