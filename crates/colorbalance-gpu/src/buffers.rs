//! GPU buffer layouts and uploads for the grading dispatch.

use bytemuck::{Pod, Zeroable};
use colorbalance_core::color_management::WorkingSpace;
use colorbalance_core::transform::coefficients::DerivedCoefficients;
use colorbalance_core::transform::params::Mode;
use colorbalance_core::RegionLayout;
use wgpu::util::DeviceExt;

/// Bytes per `vec4<f32>` pixel.
pub const PIXEL_BYTES: u64 = 16;

pub const FLAG_SATURATION: u32 = 1;
pub const FLAG_CONTRAST: u32 = 2;

/// Uniform block mirrored by `GradeParams` in `colorbalance.wgsl`.
///
/// Matrices are stored as three columns padded to `vec4`, which is the
/// uniform layout of a WGSL `mat3x3<f32>`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GradeUniforms {
    pub lift: [f32; 4],
    pub gain: [f32; 4],
    pub gamma_inv: [f32; 4],
    pub rgb_to_xyz: [[f32; 4]; 3],
    pub xyz_to_rgb: [[f32; 4]; 3],
    pub saturation: f32,
    pub contrast_inv: f32,
    pub grey: f32,
    pub flags: u32,
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub encoded: u32,
}

/// Working space a grading mode runs in.
pub fn working_space(mode: Mode) -> WorkingSpace {
    match mode {
        Mode::LegacySrgb => WorkingSpace::Srgb,
        Mode::LiftGammaGainWide | Mode::SlopeOffsetPowerWide => WorkingSpace::ProPhoto,
    }
}

impl GradeUniforms {
    /// Pack coefficients, bridge matrices and region geometry.
    pub fn new(coeffs: &DerivedCoefficients, layout: RegionLayout) -> Self {
        let space = working_space(coeffs.mode).rgb_space();
        let pad = |v: [f32; 3]| [v[0], v[1], v[2], 0.0];
        let mut flags = 0;
        if coeffs.run_saturation {
            flags |= FLAG_SATURATION;
        }
        if coeffs.run_contrast {
            flags |= FLAG_CONTRAST;
        }
        Self {
            lift: pad(coeffs.lift),
            gain: pad(coeffs.gain),
            gamma_inv: pad(coeffs.gamma_inv),
            rgb_to_xyz: space.to_xyz_columns(),
            xyz_to_rgb: space.from_xyz_columns(),
            saturation: coeffs.saturation,
            contrast_inv: coeffs.contrast_inv,
            grey: coeffs.grey_norm,
            flags,
            width: layout.width,
            height: layout.height,
            row_stride: layout.row_stride,
            encoded: u32::from(space.is_encoded()),
        }
    }
}

/// Input, output and uniform buffers of one dispatch.
pub struct RegionBuffers {
    pub input: wgpu::Buffer,
    pub output: wgpu::Buffer,
    pub uniforms: wgpu::Buffer,
    pub byte_size: u64,
}

impl RegionBuffers {
    /// Upload the input pixels and uniforms; allocate the output.
    pub fn upload(device: &wgpu::Device, pixels: &[[f32; 4]], uniforms: &GradeUniforms) -> Self {
        let byte_size = pixels.len() as u64 * PIXEL_BYTES;
        let input = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("colorbalance_region_input"),
            contents: bytemuck::cast_slice(pixels),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        });
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("colorbalance_region_output"),
            size: byte_size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("colorbalance_grade_uniforms"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        Self {
            input,
            output,
            uniforms,
            byte_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorbalance_core::{ColorBalanceParams, derive};

    #[test]
    fn test_uniform_size_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<GradeUniforms>(), 176);
    }

    #[test]
    fn test_uniform_flags_and_space() {
        let mut params = ColorBalanceParams::with_mode(Mode::LegacySrgb);
        params.contrast = 1.5;
        let u = GradeUniforms::new(&derive(&params), RegionLayout::packed(8, 2));
        assert_eq!(u.flags, FLAG_CONTRAST);
        assert_eq!(u.encoded, 1);
        assert_eq!(u.row_stride, 8);

        let u = GradeUniforms::new(
            &derive(&ColorBalanceParams::default()),
            RegionLayout::packed(1, 1),
        );
        assert_eq!(u.flags, 0);
        assert_eq!(u.encoded, 0);
        assert_eq!(u.lift[3], 0.0);
    }
}
