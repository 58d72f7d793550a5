//! GPU-to-CPU readback of graded pixels.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::GpuError;

type MapResult = Arc<Mutex<Option<Result<(), wgpu::BufferAsyncError>>>>;

/// Copy `source` into a staging buffer, block until it maps, and write the
/// pixels into `out`. `out` is only touched after the map succeeded.
pub fn download_pixels(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    byte_size: u64,
    out: &mut [[f32; 4]],
) -> Result<(), GpuError> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("colorbalance_region_staging"),
        size: byte_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("colorbalance_region_download_encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, byte_size);
    queue.submit(std::iter::once(encoder.finish()));

    let mapped: MapResult = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&mapped);
    staging
        .slice(..)
        .map_async(wgpu::MapMode::Read, move |result| {
            *slot.lock() = Some(result);
        });
    device.poll(wgpu::PollType::wait_indefinitely())?;

    match mapped.lock().take() {
        Some(Ok(())) => {}
        Some(Err(e)) => return Err(GpuError::Map(e)),
        None => return Err(GpuError::Validation("readback map callback never ran".into())),
    }

    {
        let data = staging.slice(..).get_mapped_range();
        let pixels: &[[f32; 4]] = bytemuck::cast_slice(&data);
        out.copy_from_slice(pixels);
    }
    staging.unmap();
    Ok(())
}
