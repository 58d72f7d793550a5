//! Per-pixel color balance math.
//!
//! Each algorithm is a function of one pixel and a [`PreparedKernel`]. The
//! functions are generic over [`Lanes`] so the scalar and vector backends run
//! identical formulas; the backend picks one of the three `grade_*` functions
//! once per region.
//!
//! Pixels are `[L, a, b, passthrough]`. The passthrough channel is copied.

use glam::Vec3;

use crate::color_management::{RgbSpace, lab_to_xyz, xyz_to_lab};

use super::coefficients::{DerivedCoefficients, safe_inverse};
use super::lanes::{Lanes, POW_CEILING, Rgb};
use super::params::Mode;

/// Fixed display gamma of the wide lift/gamma/gain mode.
pub const LGG_GAMMA: f32 = 2.2;

/// ASC CDL slope/offset/power on one value: `max(s*x + o, 0)^p`, capped at
/// [`POW_CEILING`].
#[inline]
pub fn cdl(x: f32, slope: f32, offset: f32, power: f32) -> f32 {
    let y = slope * x + offset;
    if y <= 0.0 { 0.0 } else { y.powf(power).min(POW_CEILING) }
}

/// Coefficients splatted into lanes, ready for the inner loop.
#[derive(Debug, Clone, Copy)]
pub struct PreparedKernel<V: Lanes> {
    lift: V,
    gain: V,
    gamma_inv: V,
    lgg_decode: V,
    lgg_encode: V,
    saturation: V,
    contrast_inv: V,
    grey: V,
    grey_inv: V,
    run_saturation: bool,
    run_contrast: bool,
}

impl<V: Lanes> PreparedKernel<V> {
    pub fn new(c: &DerivedCoefficients) -> Self {
        Self {
            lift: V::from_rgb(c.lift),
            gain: V::from_rgb(c.gain),
            gamma_inv: V::from_rgb(c.gamma_inv),
            lgg_decode: V::from_rgb(c.gamma_inv.map(|g| g * LGG_GAMMA)),
            lgg_encode: V::splat(1.0 / LGG_GAMMA),
            saturation: V::splat(c.saturation),
            contrast_inv: V::splat(c.contrast_inv),
            grey: V::splat(c.grey_norm),
            grey_inv: V::splat(safe_inverse(c.grey_norm)),
            run_saturation: c.run_saturation,
            run_contrast: c.run_contrast,
        }
    }

    #[inline]
    fn lift_gain(&self, rgb: V) -> V {
        let one = V::splat(1.0);
        ((rgb - one) * self.lift + one) * self.gain
    }

    #[inline]
    fn saturate(&self, rgb: V, luma: f32) -> V {
        if !self.run_saturation {
            return rgb;
        }
        let luma = V::splat(luma);
        luma + self.saturation * (rgb - luma)
    }

    #[inline]
    fn contrast(&self, rgb: V) -> V {
        if !self.run_contrast {
            return rgb;
        }
        (rgb * self.grey_inv).pow_or_zero(self.contrast_inv) * self.grey
    }

    /// Legacy sRGB lift/gamma/gain. No saturation or contrast stage.
    #[inline]
    pub fn legacy(&self, rgb: V) -> V {
        self.lift_gain(rgb).pow_or_zero(self.gamma_inv)
    }

    /// Lift/gamma/gain in ProPhoto through a fixed 2.2 encode.
    #[inline]
    pub fn lift_gamma_gain(&self, rgb: V, luma: f32) -> V {
        let rgb = self.saturate(rgb, luma);
        let rgb = rgb.pow_or_zero(self.lgg_encode);
        let rgb = self.lift_gain(rgb).pow_or_zero(self.lgg_decode);
        self.contrast(rgb)
    }

    /// ASC CDL slope/offset/power in linear ProPhoto.
    #[inline]
    pub fn slope_offset_power(&self, rgb: V, luma: f32) -> V {
        let rgb = self.saturate(rgb, luma);
        let rgb = (rgb * self.gain + self.lift).pow_or_zero(self.gamma_inv);
        self.contrast(rgb)
    }
}

#[inline]
fn through_space<V: Lanes>(
    pixel: [f32; 4],
    space: &RgbSpace,
    grade: impl FnOnce(V, f32) -> V,
) -> [f32; 4] {
    let xyz = lab_to_xyz([pixel[0], pixel[1], pixel[2]]);
    let rgb = space.xyz_to_rgb(xyz);
    let graded = grade(V::from_rgb(rgb.to_array()), xyz.y);
    let [l, a, b] = xyz_to_lab(space.rgb_to_xyz(Vec3::from(graded.to_rgb())));
    [l, a, b, pixel[3]]
}

/// Grade one pixel with the legacy sRGB algorithm.
#[inline]
pub fn grade_legacy<V: Lanes>(k: &PreparedKernel<V>, pixel: [f32; 4]) -> [f32; 4] {
    through_space(pixel, RgbSpace::srgb_d50(), |rgb: V, _| k.legacy(rgb))
}

/// Grade one pixel with wide lift/gamma/gain.
#[inline]
pub fn grade_lift_gamma_gain<V: Lanes>(k: &PreparedKernel<V>, pixel: [f32; 4]) -> [f32; 4] {
    through_space(pixel, RgbSpace::prophoto(), |rgb: V, luma| {
        k.lift_gamma_gain(rgb, luma)
    })
}

/// Grade one pixel with slope/offset/power.
#[inline]
pub fn grade_slope_offset_power<V: Lanes>(k: &PreparedKernel<V>, pixel: [f32; 4]) -> [f32; 4] {
    through_space(pixel, RgbSpace::prophoto(), |rgb: V, luma| {
        k.slope_offset_power(rgb, luma)
    })
}

/// Grade a single pixel with the scalar kernel.
///
/// Convenience entry point; region backends prepare the kernel once and
/// dispatch on the mode once instead.
pub fn transform_pixel(pixel: [f32; 4], coeffs: &DerivedCoefficients) -> [f32; 4] {
    let kernel = PreparedKernel::<Rgb>::new(coeffs);
    match coeffs.mode {
        Mode::LegacySrgb => grade_legacy(&kernel, pixel),
        Mode::LiftGammaGainWide => grade_lift_gamma_gain(&kernel, pixel),
        Mode::SlopeOffsetPowerWide => grade_slope_offset_power(&kernel, pixel),
    }
}
