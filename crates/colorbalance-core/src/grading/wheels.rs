//! Hue/saturation control wheels for a stage vector.
//!
//! A wheel position is an HSL color at lightness 0.5. It maps to RGB stage
//! values whose mean is neutral, so turning a wheel shifts hue without
//! changing overall lightness:
//!
//! ```text
//!   rgb  = hsl(hue, saturation, 0.5)
//!   p[c] = (rgb[c] - mean(rgb)) × 2 + 1
//! ```
//!
//! Only the RGB stage values are stored; the wheel is derived from them.

use palette::{FromColor, Hsl, Srgb};

use crate::transform::params::Channel;

/// Relaxation passes when one channel slider was edited.
const NORMALIZE_PASSES: usize = 50;

/// Below this HSL saturation a stage vector has no meaningful hue.
const ACHROMATIC: f32 = 1e-6;

/// Stage values (red, green, blue) for a wheel position.
///
/// `hue` is a turn fraction in `[0, 1)`, `saturation` in `[0, 1]`.
pub fn channels_from_hue_saturation(hue: f32, saturation: f32) -> [f32; 3] {
    let hsl: Hsl = Hsl::new(hue * 360.0, saturation, 0.5);
    let rgb: Srgb = Srgb::from_color(hsl);
    let rgb = [rgb.red, rgb.green, rgb.blue];
    let mean = (rgb[0] + rgb[1] + rgb[2]) / 3.0;

    let mut stage = [1.0; 4];
    for (c, v) in Channel::RGB.iter().zip(rgb) {
        stage[c.index()] = (v - mean) * 2.0 + 1.0;
    }
    normalize_channels(&mut stage, None);
    [stage[1], stage[2], stage[3]]
}

/// Write a wheel position into a stage vector, keeping its factor.
pub fn apply_wheel(stage: &mut [f32; 4], hue: f32, saturation: f32) {
    let [r, g, b] = channels_from_hue_saturation(hue, saturation);
    stage[Channel::Red.index()] = r;
    stage[Channel::Green.index()] = g;
    stage[Channel::Blue.index()] = b;
}

/// Wheel position `(hue, saturation)` of a stage vector, or `None` when
/// its channels are equal.
pub fn hue_saturation_of(stage: &[f32; 4]) -> Option<(f32, f32)> {
    let half = |c: Channel| stage[c.index()] / 2.0;
    let hsl: Hsl = Hsl::from_color(Srgb::new(
        half(Channel::Red),
        half(Channel::Green),
        half(Channel::Blue),
    ));
    if hsl.saturation.abs() < ACHROMATIC {
        return None;
    }
    Some((hsl.hue.into_positive_degrees() / 360.0, hsl.saturation))
}

/// Re-centre the color channels of a stage vector on neutral.
///
/// With `edited` set to a color channel, that channel is kept as the user
/// left it and the other two absorb the correction. `None` (or the factor)
/// re-centres all three in one pass.
pub fn normalize_channels(stage: &mut [f32; 4], edited: Option<Channel>) {
    let recentre = |stage: &[f32; 4], c: Channel| {
        let mean = (stage[1] + stage[2] + stage[3]) / 6.0;
        (stage[c.index()] / 2.0 - mean) * 2.0 + 1.0
    };

    match edited {
        None | Some(Channel::Factor) => {
            let snapshot = *stage;
            for c in Channel::RGB {
                stage[c.index()] = recentre(&snapshot, c);
            }
        }
        Some(kept) => {
            for _ in 0..NORMALIZE_PASSES {
                let snapshot = *stage;
                for c in Channel::RGB.into_iter().filter(|c| *c != kept) {
                    stage[c.index()] = recentre(&snapshot, c);
                }
            }
        }
    }
}
