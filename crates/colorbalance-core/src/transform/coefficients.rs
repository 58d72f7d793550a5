//! Derivation of kernel coefficients from a parameter record.
//!
//! The kernel never reads [`ColorBalanceParams`] directly. Every commit runs
//! [`derive`] once and hands the immutable result to all backends.

use crate::color_management::RgbSpace;

use super::params::{Channel, ColorBalanceParams, Mode};

/// Substitute for `1 / 0` when gamma or contrast is zero.
pub const DEGENERATE_INVERSE: f32 = 1.0e6;

/// Rescale used by the wide lift/gamma/gain mode around neutral.
const WIDE_LGG_SCALE: f32 = 2.2;

/// Per-channel multipliers and exponents consumed by the pixel kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedCoefficients {
    pub mode: Mode,
    /// Lift (lift/gamma/gain modes) or offset (slope/offset/power).
    pub lift: [f32; 3],
    /// Gain or slope.
    pub gain: [f32; 3],
    /// Reciprocal of the effective gamma, or power.
    pub gamma_inv: [f32; 3],
    pub saturation: f32,
    pub contrast_inv: f32,
    /// Contrast fulcrum as a fraction (grey / 100).
    pub grey_norm: f32,
    pub run_saturation: bool,
    pub run_contrast: bool,
}

impl Default for DerivedCoefficients {
    fn default() -> Self {
        derive(&ColorBalanceParams::default())
    }
}

/// `1 / x`, or [`DEGENERATE_INVERSE`] when `x` is exactly zero.
#[inline]
pub fn safe_inverse(x: f32) -> f32 {
    if x != 0.0 { 1.0 / x } else { DEGENERATE_INVERSE }
}

/// Remove a stage vector's luminance so a single-channel edit keeps the
/// overall brightness: `(p - Y) * 2 + 1`.
pub fn luminance_corrected(values: [f32; 3]) -> [f32; 3] {
    let y = RgbSpace::prophoto().luminance(values);
    values.map(|v| (v - y) * 2.0 + 1.0)
}

fn rgb(v: &[f32; 4]) -> [f32; 3] {
    [
        v[Channel::Red.index()],
        v[Channel::Green.index()],
        v[Channel::Blue.index()],
    ]
}

/// Turn a parameter record into kernel coefficients. Total: degenerate
/// inputs are defused, never rejected.
pub fn derive(params: &ColorBalanceParams) -> DerivedCoefficients {
    let f = Channel::Factor.index();
    let (lift_f, gamma_f, gain_f) = (params.lift[f], params.gamma[f], params.gain[f]);

    let (lift, gain, gamma) = match params.mode {
        Mode::LegacySrgb => (
            rgb(&params.lift).map(|v| 2.0 - v * lift_f),
            rgb(&params.gain).map(|v| v * gain_f),
            rgb(&params.gamma).map(|v| v * gamma_f),
        ),
        Mode::LiftGammaGainWide => {
            let wide = |v: f32| (v - 1.0) / WIDE_LGG_SCALE + 1.0;
            (
                rgb(&params.lift).map(|v| 2.0 - wide(v) * lift_f),
                rgb(&params.gain).map(|v| wide(v) * gain_f),
                rgb(&params.gamma).map(|v| wide(v) * gamma_f),
            )
        }
        Mode::SlopeOffsetPowerWide => (
            luminance_corrected(rgb(&params.lift)).map(|v| v + lift_f - 2.0),
            luminance_corrected(rgb(&params.gain)).map(|v| v * gain_f),
            luminance_corrected(rgb(&params.gamma)).map(|v| v * gamma_f),
        ),
    };

    let coeffs = DerivedCoefficients {
        mode: params.mode,
        lift,
        gain,
        gamma_inv: gamma.map(safe_inverse),
        saturation: params.saturation,
        contrast_inv: safe_inverse(params.contrast),
        grey_norm: params.grey / 100.0,
        run_saturation: params.saturation != 1.0,
        run_contrast: params.contrast != 1.0,
    };
    tracing::debug!(
        mode = ?coeffs.mode,
        lift = ?coeffs.lift,
        gain = ?coeffs.gain,
        gamma_inv = ?coeffs.gamma_inv,
        "derived color balance coefficients"
    );
    coeffs
}
