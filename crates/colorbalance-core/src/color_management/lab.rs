//! CIE L*a*b* ↔ XYZ conversions relative to the D50 white point.
//!
//! ```text
//! f(t)     = t > ε ? ∛t : (κ·t + 16) / 116
//! L        = 116·f(Y/Yn) − 16
//! a        = 500·(f(X/Xn) − f(Y/Yn))
//! b        = 200·(f(Y/Yn) − f(Z/Zn))
//! ```

use glam::Vec3;

/// D50 reference white in XYZ.
pub const D50_WHITE: [f32; 3] = [0.9642, 1.0, 0.8249];

/// CIE ε = 216 / 24389.
const EPSILON: f32 = 216.0 / 24389.0;
/// CIE κ = 24389 / 27.
const KAPPA: f32 = 24389.0 / 27.0;
/// Cube root of ε, the break point of the inverse curve (6 / 29).
const EPSILON_CBRT: f32 = 6.0 / 29.0;

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

#[inline]
fn lab_f_inv(t: f32) -> f32 {
    if t > EPSILON_CBRT {
        t * t * t
    } else {
        (116.0 * t - 16.0) / KAPPA
    }
}

/// Convert a Lab triplet to XYZ (D50).
#[inline]
pub fn lab_to_xyz(lab: [f32; 3]) -> Vec3 {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;
    Vec3::new(
        lab_f_inv(fx) * D50_WHITE[0],
        lab_f_inv(fy) * D50_WHITE[1],
        lab_f_inv(fz) * D50_WHITE[2],
    )
}

/// Convert an XYZ (D50) triplet to Lab.
#[inline]
pub fn xyz_to_lab(xyz: Vec3) -> [f32; 3] {
    let fx = lab_f(xyz.x / D50_WHITE[0]);
    let fy = lab_f(xyz.y / D50_WHITE[1]);
    let fz = lab_f(xyz.z / D50_WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}
