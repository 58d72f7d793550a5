//! sRGB transfer curve (IEC 61966-2-1) used by the legacy working space.
//!
//! ```text
//! decode: V <= 0.04045   → V / 12.92
//!         V >  0.04045   → ((V + 0.055) / 1.055) ^ 2.4
//! encode: L <= 0.0031308 → L × 12.92
//!         L >  0.0031308 → 1.055 × L^(1/2.4) − 0.055
//! ```
//!
//! Values below zero stay on the linear segment, so out-of-gamut negatives
//! pass through both directions without NaN.

/// Encoded-side end of the linear segment.
pub const SRGB_ENCODED_CUT: f32 = 0.04045;
/// Linear-side end of the linear segment.
pub const SRGB_LINEAR_CUT: f32 = 0.003_130_8;

/// Encoded sRGB value to linear light.
#[inline]
pub fn srgb_to_linear(encoded: f32) -> f32 {
    if encoded <= SRGB_ENCODED_CUT {
        encoded / 12.92
    } else {
        ((encoded + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear light to an encoded sRGB value.
#[inline]
pub fn srgb_from_linear(linear: f32) -> f32 {
    if linear <= SRGB_LINEAR_CUT {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}
