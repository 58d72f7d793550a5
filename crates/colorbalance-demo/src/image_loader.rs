//! Image loading and saving between files and Lab buffers.
//!
//! Files are read as sRGB-encoded RGBA, converted through XYZ (D50) to Lab.
//! Alpha rides along in the passthrough channel.

use std::path::Path;

use colorbalance_core::LabImage;
use colorbalance_core::color_management::{RgbSpace, lab_to_xyz, xyz_to_lab};
use rayon::prelude::*;

/// Load an image from disk as Lab.
///
/// Supports the formats of the `image` crate (PNG, JPEG, TIFF, EXR).
pub fn load_image(path: &Path) -> Result<LabImage, ImageLoadError> {
    let img = image::open(path).map_err(ImageLoadError::Decode)?;
    let rgba = img.to_rgba32f();
    let (width, height) = rgba.dimensions();
    let space = RgbSpace::srgb_d50();

    let pixels: Vec<[f32; 4]> = rgba
        .as_raw()
        .par_chunks_exact(4)
        .map(|p| {
            let [l, a, b] = xyz_to_lab(space.rgb_to_xyz([p[0], p[1], p[2]].into()));
            [l, a, b, p[3]]
        })
        .collect();

    tracing::info!(path = %path.display(), width, height, "loaded image");
    Ok(LabImage {
        width,
        height,
        pixels,
    })
}

/// Save a Lab image as 8-bit sRGB. The format follows the file extension.
pub fn save_image(path: &Path, image: &LabImage) -> Result<(), ImageLoadError> {
    let space = RgbSpace::srgb_d50();
    let data: Vec<f32> = image
        .pixels
        .par_iter()
        .flat_map_iter(|p| {
            let rgb = space.xyz_to_rgb(lab_to_xyz([p[0], p[1], p[2]]));
            [
                rgb.x.clamp(0.0, 1.0),
                rgb.y.clamp(0.0, 1.0),
                rgb.z.clamp(0.0, 1.0),
                p[3].clamp(0.0, 1.0),
            ]
        })
        .collect();

    let buffer = image::Rgba32FImage::from_raw(image.width, image.height, data)
        .ok_or(ImageLoadError::BufferSize)?;
    image::DynamicImage::ImageRgba32F(buffer)
        .to_rgba8()
        .save(path)
        .map_err(ImageLoadError::Encode)?;
    tracing::info!(path = %path.display(), "saved image");
    Ok(())
}

/// Errors that can occur during image loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
    #[error("pixel buffer does not match image dimensions")]
    BufferSize,
}
