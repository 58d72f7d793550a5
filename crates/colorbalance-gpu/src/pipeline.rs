//! Compute pipeline that grades a region in one dispatch.

use std::num::NonZeroU64;

use colorbalance_core::transform::coefficients::DerivedCoefficients;
use colorbalance_core::transform::params::Mode;
use colorbalance_core::RegionLayout;

use crate::buffers::{GradeUniforms, PIXEL_BYTES, RegionBuffers};
use crate::readback::download_pixels;
use crate::{GpuError, required_features};

/// Workgroup edge length, matching `@workgroup_size(16, 16, 1)`.
pub const WORKGROUP_SIZE: u32 = 16;

/// Owns the device and the three per-mode compute pipelines.
pub struct GpuGradingPipeline {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    legacy: wgpu::ComputePipeline,
    lift_gamma_gain: wgpu::ComputePipeline,
    slope_offset_power: wgpu::ComputePipeline,
}

impl GpuGradingPipeline {
    /// Find an adapter, open a device and build the pipelines. Blocks.
    pub fn create_blocking() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        }))?;
        let info = adapter.get_info();
        tracing::info!(adapter = %info.name, backend = ?info.backend, "opening GPU device");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("colorbalance_device"),
            required_features: required_features(),
            required_limits: adapter.limits(),
            ..Default::default()
        }))?;
        Ok(Self::new(device, queue))
    }

    /// Build the pipelines on an existing device and queue.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("colorbalance_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/colorbalance.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("colorbalance_layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(
                            std::mem::size_of::<GradeUniforms>() as u64
                        ),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("colorbalance_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make = |label: &str, entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let legacy = make("colorbalance_legacy_pipeline", "grade_legacy");
        let lift_gamma_gain = make("colorbalance_lgg_pipeline", "grade_lgg");
        let slope_offset_power = make("colorbalance_cdl_pipeline", "grade_cdl");
        tracing::info!("color balance compute pipelines created");

        Self {
            device,
            queue,
            bind_group_layout,
            legacy,
            lift_gamma_gain,
            slope_offset_power,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn pipeline_for(&self, mode: Mode) -> &wgpu::ComputePipeline {
        match mode {
            Mode::LegacySrgb => &self.legacy,
            Mode::LiftGammaGainWide => &self.lift_gamma_gain,
            Mode::SlopeOffsetPowerWide => &self.slope_offset_power,
        }
    }

    /// Grade `input` into `output` on the GPU. Blocks until the result is
    /// read back. On error `output` is left untouched.
    pub fn grade(
        &self,
        coeffs: &DerivedCoefficients,
        layout: RegionLayout,
        input: &[[f32; 4]],
        output: &mut [[f32; 4]],
    ) -> Result<(), GpuError> {
        layout.validate(input.len(), output.len())?;
        if layout.is_empty() {
            output.copy_from_slice(input);
            return Ok(());
        }

        let bytes = layout.pixel_len() as u64 * PIXEL_BYTES;
        let limit = u64::from(self.device.limits().max_storage_buffer_binding_size);
        if bytes > limit {
            return Err(GpuError::RegionTooLarge { bytes, limit });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniforms = GradeUniforms::new(coeffs, layout);
        let buffers = RegionBuffers::upload(&self.device, input, &uniforms);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("colorbalance_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.uniforms.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("colorbalance_grade_encoder"),
            });
        // Stride padding is never dispatched; seed the output with the input.
        encoder.copy_buffer_to_buffer(&buffers.input, 0, &buffers.output, 0, buffers.byte_size);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("colorbalance_grade_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(self.pipeline_for(coeffs.mode));
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                layout.width.div_ceil(WORKGROUP_SIZE),
                layout.height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            tracing::error!(error = %err, "color balance dispatch failed validation");
            return Err(GpuError::Validation(err.to_string()));
        }

        download_pixels(
            &self.device,
            &self.queue,
            &buffers.output,
            buffers.byte_size,
            output,
        )
        .inspect_err(|e| tracing::error!(error = %e, "color balance readback failed"))
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(PIXEL_BYTES),
        },
        count: None,
    }
}
