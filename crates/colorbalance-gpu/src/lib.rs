//! Colorbalance GPU: wgpu compute backend for the color balance kernel.
//!
//! Grades a whole image region in one dispatch. The crate owns its GPU
//! resources and exposes a plain wgpu API; callers fall back to the CPU
//! backends when it reports an error.

pub mod buffers;
pub mod pipeline;
pub mod readback;

pub use pipeline::GpuGradingPipeline;

/// Errors raised by the offload backend. None of them are retried here.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("region of {bytes} bytes exceeds the device storage binding limit of {limit}")]
    RegionTooLarge { bytes: u64, limit: u64 },
    #[error("GPU validation failed: {0}")]
    Validation(String),
    #[error("GPU poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("failed to map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error(transparent)]
    Buffer(#[from] colorbalance_core::BufferError),
}

/// Device features the grading pipeline needs.
pub fn required_features() -> wgpu::Features {
    wgpu::Features::empty()
}
