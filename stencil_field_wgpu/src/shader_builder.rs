use anyhow::Result;

use rust_embed::RustEmbed;

use std::borrow::Cow;

/// Compute kernels.
/// Loaded from disk in native debug builds, embedded in the binary otherwise.
#[derive(RustEmbed)]
#[folder = "shaders"]
pub struct ShaderBuilder;

impl ShaderBuilder {
    /// Load a shader file as is.
    pub fn load(name: &str) -> Result<String> {
        Self::get(name)
            .ok_or_else(|| anyhow::anyhow!("Shader not found: {name}"))
            .and_then(|file| {
                core::str::from_utf8(file.data.as_ref())
                    .map(ToOwned::to_owned)
                    .map_err(|e| anyhow::anyhow!(e))
            })
    }

    /// Load a shader file and inline its `#import "file.wgsl"` lines.
    pub fn build(name: &str) -> Result<String> {
        Self::build_with_seen(name, &mut vec![])
    }

    /// Create a shader module from a shader file.
    pub fn create_module(device: &wgpu::Device, name: &str) -> Result<wgpu::ShaderModule> {
        let shader = Self::build(name)?;

        // create_shader_module panics on malformed shaders unless an error scope is pushed.
        #[cfg(not(target_arch = "wasm32"))]
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader.as_str())),
        });

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            anyhow::bail!("Shader {name} is malformed: {error}")
        }

        Ok(module)
    }

    /// Create a compute pipeline with the layout inferred from the shader.
    pub fn create_compute_pipeline(
        device: &wgpu::Device,
        name: &str,
        entry_point: &str,
    ) -> Result<wgpu::ComputePipeline> {
        let module = Self::create_module(device, name)?;

        #[cfg(not(target_arch = "wasm32"))]
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(name),
            layout: None,
            module: &module,
            entry_point,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            anyhow::bail!("Compute pipeline {name} is malformed: {error}")
        }

        Ok(pipeline)
    }

    /// Inline imports recursively, each file at most once.
    /// WGSL declarations are order independent, so imports need no sorting,
    /// but a symbol cannot be declared twice.
    fn build_with_seen(name: &str, seen: &mut Vec<String>) -> Result<String> {
        let owned_name = name.to_owned();
        if seen.contains(&owned_name) {
            return Ok(String::new());
        }
        seen.push(owned_name);

        Self::load(name)?
            .lines()
            .map(|line| {
                // follows the bevy preprocessor syntax: #import "common.wgsl"
                if line.starts_with("#import") {
                    let include = line.split('"').nth(1).ok_or_else(|| {
                        anyhow::anyhow!("Invalid import in {name}: expected #import \"file\"")
                    })?;
                    let include_content = Self::build_with_seen(include, seen)?;
                    // keep the import commented for debugging.
                    Ok(format!("//{line}\n{include_content}"))
                } else {
                    Ok(format!("{line}\n"))
                }
            })
            .collect::<Result<String>>()
    }
}
