use std::sync::{mpsc, Arc};

use stencil_field::{
    ComputeBackend, FieldError, FieldResult, JumpFloodParams, SeedCell, VolumeCells,
};

use crate::shader_builder::ShaderBuilder;

/// Threads per workgroup on each axis, must match `@workgroup_size` in the kernels.
const WORKGROUP_SIZE: u32 = 4;

/// A volume of `SeedCell`s in a storage buffer.
#[derive(Debug)]
pub struct WgpuVolume {
    buffer: wgpu::Buffer,
    size: [usize; 3],
}

impl WgpuVolume {
    /// Number of cells on each axis.
    pub const fn size(&self) -> [usize; 3] {
        self.size
    }

    fn cell_count(&self) -> usize {
        self.size.iter().product()
    }
}

/// A copy of a volume waiting to be mapped.
#[derive(Debug)]
pub struct WgpuReadback {
    staging: wgpu::Buffer,
    receiver: mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
}

/// Runs the jump flood kernels as wgpu compute passes.
///
/// Every dispatch is submitted on its own so that one step is recorded per tick.
/// Readbacks copy into a staging buffer and are mapped asynchronously: polling them
/// only calls `Device::poll` with `Maintain::Poll`, it never waits for the GPU.
#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    params_buffer: wgpu::Buffer,
    clear_pipeline: wgpu::ComputePipeline,
    jump_flood_pipeline: wgpu::ComputePipeline,
}

impl WgpuBackend {
    /// Request a headless adapter and device, then build the pipelines.
    pub async fn new() -> FieldResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::util::backend_bits_from_env().unwrap_or_default(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::util::power_preference_from_env()
                    .unwrap_or(wgpu::PowerPreference::HighPerformance),
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| FieldError::Backend("no suitable adapter found".to_owned()))?;
        log::info!("[wgpu] using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("stencil_field::Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|err| FieldError::Backend(format!("failed to create device: {err}")))?;

        Self::from_device(device, queue)
    }

    /// Build the pipelines on an existing device.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> FieldResult<Self> {
        let clear_pipeline = ShaderBuilder::create_compute_pipeline(
            &device,
            "clear_volume.wgsl",
            "main",
        )
        .map_err(backend_error)?;
        let jump_flood_pipeline =
            ShaderBuilder::create_compute_pipeline(&device, "jump_flood.wgsl", "main")
                .map_err(backend_error)?;

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("JumpFloodParams Buffer"),
            size: core::mem::size_of::<JumpFloodParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            params_buffer,
            clear_pipeline,
            jump_flood_pipeline,
        })
    }

    /// The device the volumes live on.
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Write the uniforms, record one compute pass over `size` cells and submit it.
    fn submit_pass(
        &self,
        label: &str,
        pipeline: &wgpu::ComputePipeline,
        params: &JumpFloodParams,
        buffers: &[&wgpu::Buffer],
    ) {
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::cast_slice(&[*params]));

        let entries = core::iter::once(&self.params_buffer)
            .chain(buffers.iter().copied())
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect::<Vec<_>>();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &entries,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let [x, y, z] = params.size.map(|s| s.div_ceil(WORKGROUP_SIZE));
            pass.dispatch_workgroups(x, y, z);
        }
        self.queue.submit(Some(encoder.finish()));
    }
}

fn backend_error(err: anyhow::Error) -> FieldError {
    FieldError::Backend(format!("{err:#}"))
}

impl ComputeBackend for WgpuBackend {
    type Volume = WgpuVolume;
    type Readback = WgpuReadback;

    fn create_volume(&mut self, grid_size: [usize; 3]) -> FieldResult<Self::Volume> {
        if grid_size.contains(&0) {
            return Err(FieldError::ZeroSizedGrid(grid_size));
        }
        let bytes = grid_size.iter().product::<usize>() * core::mem::size_of::<SeedCell>();
        if bytes as u64 > u64::from(self.device.limits().max_storage_buffer_binding_size) {
            return Err(FieldError::Backend(format!(
                "volume {grid_size:?} does not fit in a storage buffer"
            )));
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SeedCell Volume Buffer"),
            size: bytes as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Ok(WgpuVolume {
            buffer,
            size: grid_size,
        })
    }

    fn clear_volume(&mut self, volume: &mut Self::Volume) -> FieldResult<()> {
        let params = JumpFloodParams::from_size(volume.size, glam::Vec3::ONE, 0);
        self.submit_pass(
            "clear_volume",
            &self.clear_pipeline,
            &params,
            &[&volume.buffer],
        );
        Ok(())
    }

    fn upload_volume(&mut self, volume: &mut Self::Volume, cells: &[SeedCell]) -> FieldResult<()> {
        if volume.cell_count() != cells.len() {
            return Err(FieldError::SizeMismatch {
                expected: volume.cell_count(),
                found: cells.len(),
            });
        }
        self.queue
            .write_buffer(&volume.buffer, 0, bytemuck::cast_slice(cells));
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
                expected: src.cell_count(),
                found: dst.cell_count(),
            });
        }
        self.submit_pass(
            "jump_flood",
            &self.jump_flood_pipeline,
            params,
            &[&src.buffer, &dst.buffer],
        );
        Ok(())
    }

    fn request_readback(&mut self, volume: &Self::Volume) -> FieldResult<Self::Readback> {
        let size = volume.buffer.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SeedCell Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
        encoder.copy_buffer_to_buffer(&volume.buffer, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let (sender, receiver) = mpsc::channel();
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            // the readback may have been dropped by a rebuild.
            sender.send(result).ok();
        });

        Ok(WgpuReadback { staging, receiver })
    }

    fn poll_readback(
        &mut self,
        readback: &mut Self::Readback,
    ) -> Option<FieldResult<VolumeCells>> {
        self.device.poll(wgpu::Maintain::Poll);

        match readback.receiver.try_recv() {
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(FieldError::Backend(
                "readback callback dropped".to_owned(),
            ))),
            Ok(Err(err)) => Some(Err(FieldError::Backend(format!(
                "failed to map readback buffer: {err}"
            )))),
            Ok(Ok(())) => {
                let cells = {
                    let mapped = readback.staging.slice(..).get_mapped_range();
                    bytemuck::pod_collect_to_vec::<u8, SeedCell>(&mapped)
                };
                readback.staging.unmap();
                Some(Ok(Arc::new(cells)))
            }
        }
    }

    fn release_volume(&mut self, volume: Self::Volume) {
        volume.buffer.destroy();
    }
}

impl Drop for WgpuReadback {
    fn drop(&mut self) {
        self.staging.destroy();
    }
}
