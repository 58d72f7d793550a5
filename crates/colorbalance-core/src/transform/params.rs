//! The persisted parameter record for the color balance stage.
//!
//! `ColorBalanceParams` is the single source of truth for a grade. UI edits,
//! the auto-balance solver, and version migration all write here; the
//! coefficient deriver reads the whole record.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

/// Grading algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Lift/gamma/gain in gamma-encoded sRGB. Kept for old presets.
    LegacySrgb,
    /// Lift/gamma/gain in ProPhoto RGB through a fixed 2.2 encode.
    LiftGammaGainWide,
    /// ASC CDL slope/offset/power in linear ProPhoto RGB.
    #[default]
    SlopeOffsetPowerWide,
}

impl Mode {
    /// Human-readable label for UI menus and logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::LegacySrgb => "lift, gamma, gain (sRGB)",
            Self::LiftGammaGainWide => "lift, gamma, gain (ProPhoto)",
            Self::SlopeOffsetPowerWide => "slope, offset, power (ProPhoto)",
        }
    }
}

/// Slot of a lift/gamma/gain vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Applies to all three color channels.
    Factor,
    Red,
    Green,
    Blue,
}

impl Channel {
    /// The three color channels, in vector order.
    pub const RGB: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Position of this slot in a `[f32; 4]` stage vector.
    pub const fn index(self) -> usize {
        match self {
            Self::Factor => 0,
            Self::Red => 1,
            Self::Green => 2,
            Self::Blue => 3,
        }
    }
}

/// One of the three grading stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lift,
    Gamma,
    Gain,
}

impl Stage {
    pub const ALL: [Self; 3] = [Self::Lift, Self::Gamma, Self::Gain];

    /// Position in per-stage arrays (`[lift, gamma, gain]`).
    pub const fn index(self) -> usize {
        match self {
            Self::Lift => 0,
            Self::Gamma => 1,
            Self::Gain => 2,
        }
    }
}

/// A neutral stage vector.
pub const NEUTRAL: [f32; 4] = [1.0; 4];

/// Full parameter set of one color balance stage.
///
/// Stage vectors are indexed by [`Channel::index`]: factor, red, green, blue.
/// 1.0 is neutral (100 %) for every entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBalanceParams {
    pub mode: Mode,
    pub lift: [f32; 4],
    pub gamma: [f32; 4],
    pub gain: [f32; 4],
    pub saturation: f32,
    pub contrast: f32,
    /// Contrast fulcrum in percent, in (0, 100].
    pub grey: f32,
}

impl Default for ColorBalanceParams {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            lift: NEUTRAL,
            gamma: NEUTRAL,
            gain: NEUTRAL,
            saturation: 1.0,
            contrast: 1.0,
            grey: 18.0,
        }
    }
}

impl ColorBalanceParams {
    /// Defaults with a different grading algorithm.
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The vector of one stage.
    pub fn stage(&self, stage: Stage) -> &[f32; 4] {
        match stage {
            Stage::Lift => &self.lift,
            Stage::Gamma => &self.gamma,
            Stage::Gain => &self.gain,
        }
    }

    /// Mutable access to the vector of one stage.
    pub fn stage_mut(&mut self, stage: Stage) -> &mut [f32; 4] {
        match stage {
            Stage::Lift => &mut self.lift,
            Stage::Gamma => &mut self.gamma,
            Stage::Gain => &mut self.gain,
        }
    }

    /// One slot of one stage.
    pub fn value(&self, stage: Stage, channel: Channel) -> f32 {
        self.stage(stage)[channel.index()]
    }

    /// Set one slot of one stage.
    pub fn set_value(&mut self, stage: Stage, channel: Channel, value: f32) {
        self.stage_mut(stage)[channel.index()] = value;
    }

    /// Whether every control sits at its neutral value.
    pub fn is_neutral(&self) -> bool {
        self.lift == NEUTRAL
            && self.gamma == NEUTRAL
            && self.gain == NEUTRAL
            && self.saturation == 1.0
            && self.contrast == 1.0
    }

    /// Reset every stage to neutral, keeping the mode and fulcrum.
    pub fn reset(&mut self) {
        *self = Self {
            mode: self.mode,
            grey: self.grey,
            ..Self::default()
        };
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ParamsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a preset. Accepts the current record and the older
    /// lift/gamma/gain-only record, which is migrated.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let stored: StoredParams = serde_json::from_str(json)?;
        Ok(match stored {
            StoredParams::Current(params) => params,
            StoredParams::V1(old) => {
                tracing::debug!("migrating version 1 color balance preset");
                old.into()
            }
        })
    }

    /// Write a preset file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParamsError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a preset file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// First-generation preset: three stage vectors and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyParamsV1 {
    pub lift: [f32; 4],
    pub gamma: [f32; 4],
    pub gain: [f32; 4],
}

impl From<LegacyParamsV1> for ColorBalanceParams {
    fn from(old: LegacyParamsV1) -> Self {
        Self {
            mode: Mode::LegacySrgb,
            lift: old.lift,
            gamma: old.gamma,
            gain: old.gain,
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredParams {
    Current(ColorBalanceParams),
    V1(LegacyParamsV1),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_neutral_sop() {
        let params = ColorBalanceParams::default();
        assert_eq!(params.mode, Mode::SlopeOffsetPowerWide);
        assert!(params.is_neutral());
        assert_eq!(params.grey, 18.0);
    }

    #[test]
    fn test_channel_indexing() {
        let mut params = ColorBalanceParams::default();
        params.set_value(Stage::Gain, Channel::Green, 1.5);
        assert_eq!(params.gain, [1.0, 1.0, 1.5, 1.0]);
        assert_eq!(params.value(Stage::Gain, Channel::Green), 1.5);
        assert_eq!(params.stage(Stage::Gain)[Channel::Factor.index()], 1.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut params = ColorBalanceParams::with_mode(Mode::LiftGammaGainWide);
        params.lift = [1.0, 0.9, 1.1, 1.0];
        params.contrast = 1.3;
        let json = params.to_json().unwrap();
        assert!(json.contains("lift_gamma_gain_wide"));
        assert_eq!(ColorBalanceParams::from_json(&json).unwrap(), params);
    }

    #[test]
    fn test_v1_preset_migrates_all_four_entries() {
        let json = r#"{
            "lift": [1.1, 0.9, 1.0, 1.2],
            "gamma": [1.0, 1.0, 0.8, 1.0],
            "gain": [0.7, 1.0, 1.0, 1.3]
        }"#;
        let params = ColorBalanceParams::from_json(json).unwrap();
        assert_eq!(params.mode, Mode::LegacySrgb);
        assert_eq!(params.lift, [1.1, 0.9, 1.0, 1.2]);
        assert_eq!(params.gamma, [1.0, 1.0, 0.8, 1.0]);
        assert_eq!(params.gain, [0.7, 1.0, 1.0, 1.3]);
        assert_eq!(params.saturation, 1.0);
        assert_eq!(params.grey, 18.0);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            ColorBalanceParams::from_json("{\"lift\": 3}"),
            Err(ParamsError::Json(_))
        ));
    }

    #[test]
    fn test_reset_keeps_mode_and_grey() {
        let mut params = ColorBalanceParams::with_mode(Mode::LegacySrgb);
        params.gain[0] = 2.0;
        params.grey = 30.0;
        params.reset();
        assert_eq!(params.mode, Mode::LegacySrgb);
        assert_eq!(params.grey, 30.0);
        assert!(params.is_neutral());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!(
            "colorbalance-params-{}.json",
            std::process::id()
        ));
        let mut params = ColorBalanceParams::default();
        params.saturation = 0.5;
        params.save(&path).unwrap();
        let loaded = ColorBalanceParams::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, params);
    }
}
