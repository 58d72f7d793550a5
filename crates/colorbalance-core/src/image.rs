//! Image buffers and region layouts for the grading backends.
//!
//! Pixels are interleaved `[f32; 4]`: three Lab channels followed by a
//! passthrough channel (alpha or mask) that grading never touches.

use crate::error::BufferError;

/// Geometry of one image region handed to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    /// Pixels per row that are graded.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Distance between row starts, in pixels. Must be `>= width`.
    pub row_stride: u32,
}

impl RegionLayout {
    /// A tightly packed region (`row_stride == width`).
    pub fn packed(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            row_stride: width,
        }
    }

    /// Number of pixels a buffer must hold for this layout.
    pub fn pixel_len(&self) -> usize {
        self.row_stride as usize * self.height as usize
    }

    /// Whether the region contains no pixels at all.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check the layout against an input and output buffer.
    pub fn validate(&self, input_len: usize, output_len: usize) -> Result<(), BufferError> {
        if self.row_stride < self.width {
            return Err(BufferError::StrideTooSmall {
                width: self.width,
                row_stride: self.row_stride,
            });
        }
        let expected = self.pixel_len();
        if input_len != expected {
            return Err(BufferError::LengthMismatch {
                which: "input",
                expected,
                actual: input_len,
            });
        }
        if output_len != expected {
            return Err(BufferError::LengthMismatch {
                which: "output",
                expected,
                actual: output_len,
            });
        }
        Ok(())
    }
}

/// View a flat `f32` buffer as 4-channel pixels.
pub fn as_pixels(data: &[f32]) -> Result<&[[f32; 4]], BufferError> {
    bytemuck::try_cast_slice(data).map_err(|_| BufferError::Unaligned(data.len()))
}

/// View a flat mutable `f32` buffer as 4-channel pixels.
pub fn as_pixels_mut(data: &mut [f32]) -> Result<&mut [[f32; 4]], BufferError> {
    let len = data.len();
    bytemuck::try_cast_slice_mut(data).map_err(|_| BufferError::Unaligned(len))
}

/// Owned Lab image, always tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct LabImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel data as `[L, a, b, passthrough]`.
    pub pixels: Vec<[f32; 4]>,
}

impl LabImage {
    /// A new image filled with one pixel value.
    pub fn filled(width: u32, height: u32, pixel: [f32; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; width as usize * height as usize],
        }
    }

    /// The layout describing this image's buffer.
    pub fn layout(&self) -> RegionLayout {
        RegionLayout::packed(self.width, self.height)
    }

    /// Nearest-neighbour downscale so the long edge is at most `max_edge`.
    ///
    /// Used to produce a preview region graded alongside the full image.
    pub fn thumbnail(&self, max_edge: u32) -> Self {
        let long_edge = self.width.max(self.height);
        if max_edge == 0 || long_edge <= max_edge || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        let scale = max_edge as f32 / long_edge as f32;
        let width = ((self.width as f32 * scale).round() as u32).max(1);
        let height = ((self.height as f32 * scale).round() as u32).max(1);

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let sy = ((y as f32 + 0.5) / scale) as u32;
            let sy = sy.min(self.height - 1);
            for x in 0..width {
                let sx = (((x as f32 + 0.5) / scale) as u32).min(self.width - 1);
                pixels.push(self.pixels[(sy * self.width + sx) as usize]);
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_strided_layout() {
        let layout = RegionLayout {
            width: 3,
            height: 2,
            row_stride: 4,
        };
        assert_eq!(layout.pixel_len(), 8);
        assert!(layout.validate(8, 8).is_ok());
    }

    #[test]
    fn test_validate_rejects_short_stride() {
        let layout = RegionLayout {
            width: 4,
            height: 1,
            row_stride: 3,
        };
        assert_eq!(
            layout.validate(3, 3),
            Err(BufferError::StrideTooSmall {
                width: 4,
                row_stride: 3
            })
        );
    }

    #[test]
    fn test_validate_rejects_wrong_output_length() {
        let layout = RegionLayout::packed(2, 2);
        assert!(matches!(
            layout.validate(4, 3),
            Err(BufferError::LengthMismatch { which: "output", .. })
        ));
    }

    #[test]
    fn test_as_pixels_rejects_partial_pixel() {
        let data = [0.0_f32; 6];
        assert_eq!(as_pixels(&data), Err(BufferError::Unaligned(6)));
        let data = [0.0_f32; 8];
        assert_eq!(as_pixels(&data).map(|p| p.len()), Ok(2));
    }

    #[test]
    fn test_thumbnail_limits_long_edge() {
        let image = LabImage::filled(100, 50, [50.0, 0.0, 0.0, 1.0]);
        let thumb = image.thumbnail(20);
        assert_eq!(thumb.width, 20);
        assert_eq!(thumb.height, 10);
        assert_eq!(thumb.pixels.len(), 200);
    }

    #[test]
    fn test_thumbnail_keeps_small_images() {
        let image = LabImage::filled(8, 8, [50.0, 0.0, 0.0, 1.0]);
        assert_eq!(image.thumbnail(16), image);
    }
}
