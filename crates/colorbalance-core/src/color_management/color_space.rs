//! RGB working spaces and their 3x3 XYZ transforms.
//!
//! Two spaces are used by the grading kernel:
//! - linear ProPhoto RGB (D50), the wide-gamut space for the modern modes
//! - sRGB with D50-adapted (Bradford) primaries and the sRGB transfer curve,
//!   the narrower space of the legacy mode
//!
//! Only the forward RGB → XYZ matrices are written down; the inverses are
//! computed once so a round trip is as tight as f32 allows.

use std::sync::LazyLock;

use glam::{Mat3, Vec3};

use super::transfer::{srgb_from_linear, srgb_to_linear};

/// Identifies the RGB space a grading algorithm works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingSpace {
    /// D50-adapted sRGB, gamma encoded.
    Srgb,
    /// Linear ProPhoto RGB.
    ProPhoto,
}

impl WorkingSpace {
    /// The conversion matrices for this space.
    pub fn rgb_space(self) -> &'static RgbSpace {
        match self {
            Self::Srgb => RgbSpace::srgb_d50(),
            Self::ProPhoto => RgbSpace::prophoto(),
        }
    }
}

/// An RGB space described by its XYZ matrices and optional transfer curve.
#[derive(Debug, Clone, Copy)]
pub struct RgbSpace {
    to_xyz: Mat3,
    from_xyz: Mat3,
    /// RGB values carry the sRGB transfer curve.
    encoded: bool,
}

/// Row-major ProPhoto RGB → XYZ (D50).
const PROPHOTO_TO_XYZ: [[f32; 3]; 3] = [
    [0.797_674_9, 0.135_191_7, 0.031_353_4],
    [0.288_040_2, 0.711_874_1, 0.000_085_7],
    [0.0, 0.0, 0.825_210_0],
];

/// Row-major linear sRGB → XYZ, Bradford-adapted to D50.
const SRGB_D50_TO_XYZ: [[f32; 3]; 3] = [
    [0.436_074_7, 0.385_064_9, 0.143_080_4],
    [0.222_504_5, 0.716_878_6, 0.060_616_9],
    [0.013_932_2, 0.097_104_5, 0.714_173_3],
];

static PROPHOTO: LazyLock<RgbSpace> = LazyLock::new(|| RgbSpace::from_rows(PROPHOTO_TO_XYZ, false));
static SRGB_D50: LazyLock<RgbSpace> =
    LazyLock::new(|| RgbSpace::from_rows(SRGB_D50_TO_XYZ, true));

impl RgbSpace {
    fn from_rows(rows: [[f32; 3]; 3], encoded: bool) -> Self {
        // glam stores columns; the table above is written row by row.
        let to_xyz = Mat3::from_cols_array_2d(&rows).transpose();
        Self {
            to_xyz,
            from_xyz: to_xyz.inverse(),
            encoded,
        }
    }

    /// Linear ProPhoto RGB (D50).
    pub fn prophoto() -> &'static Self {
        &PROPHOTO
    }

    /// D50-adapted sRGB with the sRGB transfer curve on the RGB side.
    pub fn srgb_d50() -> &'static Self {
        &SRGB_D50
    }

    /// Whether RGB values in this space are transfer-encoded.
    pub fn is_encoded(&self) -> bool {
        self.encoded
    }

    /// Convert XYZ to (possibly encoded) RGB.
    #[inline]
    pub fn xyz_to_rgb(&self, xyz: Vec3) -> Vec3 {
        let linear = self.from_xyz * xyz;
        if self.encoded {
            Vec3::from(linear.to_array().map(srgb_from_linear))
        } else {
            linear
        }
    }

    /// Convert (possibly encoded) RGB to XYZ.
    #[inline]
    pub fn rgb_to_xyz(&self, rgb: Vec3) -> Vec3 {
        let linear = if self.encoded {
            Vec3::from(rgb.to_array().map(srgb_to_linear))
        } else {
            rgb
        };
        self.to_xyz * linear
    }

    /// Relative luminance (the Y row) of an RGB triplet in this space.
    #[inline]
    pub fn luminance(&self, rgb: [f32; 3]) -> f32 {
        self.rgb_to_xyz(Vec3::from(rgb)).y
    }

    /// RGB → XYZ matrix columns, each padded to four floats for GPU uniforms.
    pub fn to_xyz_columns(&self) -> [[f32; 4]; 3] {
        padded_columns(&self.to_xyz)
    }

    /// XYZ → RGB matrix columns, each padded to four floats for GPU uniforms.
    pub fn from_xyz_columns(&self) -> [[f32; 4]; 3] {
        padded_columns(&self.from_xyz)
    }
}

fn padded_columns(m: &Mat3) -> [[f32; 4]; 3] {
    std::array::from_fn(|i| {
        let col = m.col(i);
        [col.x, col.y, col.z, 0.0]
    })
}
