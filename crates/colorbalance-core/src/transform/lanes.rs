//! Channel-parallel arithmetic shared by the scalar and vector backends.
//!
//! The grading formulas in [`super::kernel`] are written once against
//! [`Lanes`]. The scalar backend instantiates them with [`Rgb`], the vector
//! backend with `wide::f32x4`, so both run the same expression tree.

use std::ops::{Add, Mul, Sub};

use wide::{CmpGt, f32x4};

/// Upper bound on any powered value. A zero gamma or contrast turns into an
/// exponent of 1e6, which overflows for bases above one; the ceiling keeps the
/// following matrix and Lab steps finite.
pub const POW_CEILING: f32 = 1.0e6;

/// Three color channels processed as a unit.
pub trait Lanes:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Send + Sync
{
    fn splat(v: f32) -> Self;
    fn from_rgb(rgb: [f32; 3]) -> Self;
    fn to_rgb(self) -> [f32; 3];

    /// `x <= 0 ? 0 : min(x^e, POW_CEILING)` per channel. Always finite and
    /// non-negative for a finite exponent.
    fn pow_or_zero(self, exponent: Self) -> Self;
}

/// Plain scalar RGB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    #[inline]
    fn zip(self, rhs: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        Self([
            f(self.0[0], rhs.0[0]),
            f(self.0[1], rhs.0[1]),
            f(self.0[2], rhs.0[2]),
        ])
    }
}

impl Add for Rgb {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a + b)
    }
}

impl Sub for Rgb {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a - b)
    }
}

impl Mul for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a * b)
    }
}

impl Lanes for Rgb {
    #[inline]
    fn splat(v: f32) -> Self {
        Self([v; 3])
    }

    #[inline]
    fn from_rgb(rgb: [f32; 3]) -> Self {
        Self(rgb)
    }

    #[inline]
    fn to_rgb(self) -> [f32; 3] {
        self.0
    }

    #[inline]
    fn pow_or_zero(self, exponent: Self) -> Self {
        self.zip(exponent, |x, e| {
            if x <= 0.0 { 0.0 } else { x.powf(e).min(POW_CEILING) }
        })
    }
}

impl Lanes for f32x4 {
    #[inline]
    fn splat(v: f32) -> Self {
        f32x4::splat(v)
    }

    #[inline]
    fn from_rgb(rgb: [f32; 3]) -> Self {
        f32x4::from([rgb[0], rgb[1], rgb[2], 0.0])
    }

    #[inline]
    fn to_rgb(self) -> [f32; 3] {
        let [r, g, b, _] = self.to_array();
        [r, g, b]
    }

    #[inline]
    fn pow_or_zero(self, exponent: Self) -> Self {
        let zero = f32x4::splat(0.0);
        let positive = self.cmp_gt(zero);
        // Keep the masked-off lanes away from ln(0).
        let base = self.max(f32x4::splat(f32::MIN_POSITIVE));
        let powered = base.pow_f32x4(exponent).min(f32x4::splat(POW_CEILING));
        positive.blend(powered, zero)
    }
}
