//! Backend selection and fallback for rendering a graded image.

use colorbalance_core::{BufferError, CpuBackend, DerivedCoefficients, LabImage, process_region};
use colorbalance_gpu::{GpuError, GpuGradingPipeline};

use crate::config::BackendChoice;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// Renders Lab images with the configured backend, falling back from the
/// GPU to the vector backend when the GPU is missing or a dispatch fails.
pub struct Renderer {
    gpu: Option<GpuGradingPipeline>,
    cpu: CpuBackend,
}

impl Renderer {
    pub fn new(choice: BackendChoice) -> Self {
        let gpu = match choice {
            BackendChoice::Gpu => match GpuGradingPipeline::create_blocking() {
                Ok(pipeline) => Some(pipeline),
                Err(e) => {
                    tracing::warn!(error = %e, "GPU unavailable, using the vector backend");
                    None
                }
            },
            BackendChoice::Vector | BackendChoice::Scalar => None,
        };
        let cpu = match choice {
            BackendChoice::Scalar => CpuBackend::Scalar,
            BackendChoice::Gpu | BackendChoice::Vector => CpuBackend::Vector,
        };
        Self { gpu, cpu }
    }

    /// Grade a whole image. Never returns a partially written image.
    pub fn render(
        &self,
        coeffs: &DerivedCoefficients,
        image: &LabImage,
    ) -> Result<LabImage, RenderError> {
        let layout = image.layout();
        let mut output = vec![[0.0; 4]; image.pixels.len()];

        if let Some(gpu) = &self.gpu {
            match gpu.grade(coeffs, layout, &image.pixels, &mut output) {
                Ok(()) => return Ok(with_pixels(image, output)),
                Err(GpuError::Buffer(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(error = %e, backend = self.cpu.label(), "GPU pass failed, falling back");
                }
            }
        }

        process_region(self.cpu, coeffs, layout, &image.pixels, &mut output)?;
        Ok(with_pixels(image, output))
    }

    /// Grade the image and a downscaled preview of it at the same time,
    /// against the same coefficient snapshot.
    pub fn render_with_preview(
        &self,
        coeffs: &DerivedCoefficients,
        image: &LabImage,
        preview_edge: u32,
    ) -> (Result<LabImage, RenderError>, Option<Result<LabImage, RenderError>>) {
        if preview_edge == 0 {
            return (self.render(coeffs, image), None);
        }
        let preview = image.thumbnail(preview_edge);
        let (full, small) = rayon::join(
            || self.render(coeffs, image),
            || self.render_cpu(coeffs, &preview),
        );
        (full, Some(small))
    }

    fn render_cpu(
        &self,
        coeffs: &DerivedCoefficients,
        image: &LabImage,
    ) -> Result<LabImage, RenderError> {
        let mut output = vec![[0.0; 4]; image.pixels.len()];
        process_region(self.cpu, coeffs, image.layout(), &image.pixels, &mut output)?;
        Ok(with_pixels(image, output))
    }
}

fn with_pixels(image: &LabImage, pixels: Vec<[f32; 4]>) -> LabImage {
    LabImage {
        width: image.width,
        height: image.height,
        pixels,
    }
}
