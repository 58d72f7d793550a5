//! CPU execution backends.
//!
//! Both backends fan rows out over the rayon pool. Each worker owns a
//! disjoint output row and reads only its input row and the shared,
//! immutable coefficients.

use rayon::prelude::*;
use wide::f32x4;

use crate::error::BufferError;
use crate::image::RegionLayout;
use crate::transform::coefficients::DerivedCoefficients;
use crate::transform::kernel::{
    PreparedKernel, grade_legacy, grade_lift_gamma_gain, grade_slope_offset_power,
};
use crate::transform::lanes::{Lanes, Rgb};
use crate::transform::params::Mode;

/// Which CPU kernel instantiation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuBackend {
    /// One channel at a time.
    Scalar,
    /// The three channels of a pixel in one 4-wide SIMD register.
    #[default]
    Vector,
}

impl CpuBackend {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Vector => "vector",
        }
    }
}

/// Grade every pixel of a region from `input` into `output`.
///
/// Pixels between `width` and `row_stride` are copied unchanged. Either the
/// whole region is written or, on a layout error, nothing is.
pub fn process_region(
    backend: CpuBackend,
    coeffs: &DerivedCoefficients,
    layout: RegionLayout,
    input: &[[f32; 4]],
    output: &mut [[f32; 4]],
) -> Result<(), BufferError> {
    layout.validate(input.len(), output.len())?;
    tracing::trace!(
        backend = backend.label(),
        width = layout.width,
        height = layout.height,
        "processing region"
    );
    match backend {
        CpuBackend::Scalar => dispatch::<Rgb>(coeffs, layout, input, output),
        CpuBackend::Vector => dispatch::<f32x4>(coeffs, layout, input, output),
    }
    Ok(())
}

/// Select the algorithm once for the whole region.
fn dispatch<V: Lanes>(
    coeffs: &DerivedCoefficients,
    layout: RegionLayout,
    input: &[[f32; 4]],
    output: &mut [[f32; 4]],
) {
    let kernel = PreparedKernel::<V>::new(coeffs);
    match coeffs.mode {
        Mode::LegacySrgb => run_rows(&kernel, layout, input, output, grade_legacy),
        Mode::LiftGammaGainWide => run_rows(&kernel, layout, input, output, grade_lift_gamma_gain),
        Mode::SlopeOffsetPowerWide => {
            run_rows(&kernel, layout, input, output, grade_slope_offset_power)
        }
    }
}

fn run_rows<V, F>(
    kernel: &PreparedKernel<V>,
    layout: RegionLayout,
    input: &[[f32; 4]],
    output: &mut [[f32; 4]],
    grade: F,
) where
    V: Lanes,
    F: Fn(&PreparedKernel<V>, [f32; 4]) -> [f32; 4] + Sync,
{
    let stride = layout.row_stride as usize;
    let width = layout.width as usize;
    if stride == 0 {
        return;
    }
    output
        .par_chunks_mut(stride)
        .zip(input.par_chunks(stride))
        .for_each(|(out_row, in_row)| {
            let (graded, padding) = out_row.split_at_mut(width);
            for (dst, src) in graded.iter_mut().zip(&in_row[..width]) {
                *dst = grade(kernel, *src);
            }
            padding.copy_from_slice(&in_row[width..]);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::coefficients::derive;
    use crate::transform::params::{Channel, ColorBalanceParams, Stage};

    fn ramp(layout: RegionLayout) -> Vec<[f32; 4]> {
        (0..layout.pixel_len())
            .map(|i| {
                let t = i as f32 / layout.pixel_len().max(1) as f32;
                [10.0 + 80.0 * t, 30.0 - 60.0 * t, -20.0 + 40.0 * t, t]
            })
            .collect()
    }

    #[test]
    fn test_padding_is_copied_through() {
        let layout = RegionLayout {
            width: 2,
            height: 3,
            row_stride: 3,
        };
        let mut params = ColorBalanceParams::default();
        params.set_value(Stage::Gain, Channel::Factor, 1.4);
        let coeffs = derive(&params);
        let input = ramp(layout);
        let mut output = vec![[0.0; 4]; layout.pixel_len()];
        process_region(CpuBackend::Scalar, &coeffs, layout, &input, &mut output).unwrap();
        for row in 0..3 {
            let pad = row * 3 + 2;
            assert_eq!(output[pad], input[pad]);
            assert_ne!(output[row * 3], input[row * 3]);
        }
    }

    #[test]
    fn test_layout_error_leaves_output_untouched() {
        let layout = RegionLayout::packed(4, 4);
        let input = vec![[50.0, 0.0, 0.0, 1.0]; 16];
        let mut output = vec![[-1.0; 4]; 15];
        let err = process_region(
            CpuBackend::Vector,
            &DerivedCoefficients::default(),
            layout,
            &input,
            &mut output,
        );
        assert!(err.is_err());
        assert!(output.iter().all(|p| *p == [-1.0; 4]));
    }

    #[test]
    fn test_empty_region_is_ok() {
        let layout = RegionLayout::packed(0, 0);
        let mut output = Vec::new();
        process_region(CpuBackend::Scalar, &DerivedCoefficients::default(), layout, &[], &mut output)
            .unwrap();
    }

    #[test]
    fn test_region_matches_single_pixel_entry_point() {
        let layout = RegionLayout::packed(5, 4);
        let input = ramp(layout);
        let mut params = ColorBalanceParams::with_mode(Mode::LiftGammaGainWide);
        params.set_value(Stage::Lift, Channel::Blue, 1.1);
        params.contrast = 1.2;
        let coeffs = derive(&params);
        let mut output = vec![[0.0; 4]; layout.pixel_len()];
        process_region(CpuBackend::Scalar, &coeffs, layout, &input, &mut output).unwrap();
        for (out, inp) in output.iter().zip(&input) {
            assert_eq!(*out, crate::transform_pixel(*inp, &coeffs));
        }
    }
}
