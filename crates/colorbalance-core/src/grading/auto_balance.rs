//! Auto-balance: derive lift/gamma/gain from picked patches.
//!
//! Patches are colors picked from the image and tagged with the stage they
//! represent (shadows for lift, midtones for gamma, highlights for gain).
//! Samples live in linear ProPhoto RGB. Every solver first applies the
//! current factor (master) settings as a CDL, then solves the per-channel
//! values so the patch turns neutral, and finally re-centres the result on
//! luminance so overall brightness is kept:
//!
//! ```text
//!   sample' = cdl(sample, gain[F], lift[F] − 1, 1 / gamma[F])
//!   grey    = mean(sample')
//!   out[c]  = out[c] − Y(out) + 1
//! ```
//!
//! The solvers are pure: they return an updated copy of the parameters.
//! [`AutoBalance`] ties them to a [`GradingStage`] and commits each result.

use crate::color_management::{RgbSpace, lab_to_xyz};
use crate::error::{SampleKind, SolverError};
use crate::transform::coefficients::safe_inverse;
use crate::transform::kernel::cdl;
use crate::transform::params::{Channel, ColorBalanceParams, Stage};
use crate::transform::stage::GradingStage;

/// Relaxation passes of the batch optimizers.
pub const OPTIMIZE_ITERATIONS: usize = 100;

/// Clamp window of the per-channel gain (slope) during optimization.
pub const GAIN_BOUNDS: (f32, f32) = (0.75, 1.25);
/// Clamp window of the per-channel lift (offset, stored minus one).
pub const LIFT_BOUNDS: (f32, f32) = (-0.25, 0.25);
/// Clamp window of the per-channel gamma (power).
pub const GAMMA_BOUNDS: (f32, f32) = (0.25, 1.25);
/// Clamp window of the factors in the luma optimizer.
pub const FACTOR_BOUNDS: (f32, f32) = (0.0, 2.0);

/// Scene-referred middle grey targeted by the gamma factor.
pub const MIDDLE_GREY: f32 = 0.18;

const TINY: f32 = 1e-6;

/// A picked color tagged with the stage it should neutralize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchSample {
    pub stage: Stage,
    /// Linear ProPhoto RGB.
    pub rgb: [f32; 3],
}

impl PatchSample {
    pub fn new(stage: Stage, rgb: [f32; 3]) -> Self {
        Self { stage, rgb }
    }

    /// Convert a picked Lab color to a working-space sample.
    pub fn from_lab(stage: Stage, lab: [f32; 3]) -> Self {
        let rgb = RgbSpace::prophoto().xyz_to_rgb(lab_to_xyz(lab));
        Self::new(stage, rgb.to_array())
    }
}

/// One color sample per stage, collected as the user picks them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorPatches([Option<[f32; 3]>; 3]);

impl ColorPatches {
    /// Store a sample, replacing an earlier one for the same stage.
    pub fn record(&mut self, sample: PatchSample) {
        self.0[sample.stage.index()] = Some(sample.rgb);
    }

    pub fn get(&self, stage: Stage) -> Option<[f32; 3]> {
        self.0[stage.index()]
    }

    /// Number of stages that have a sample.
    pub fn len(&self) -> usize {
        self.0.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn complete(&self) -> Result<[[f32; 3]; 3], SolverError> {
        match self.0 {
            [Some(lift), Some(gamma), Some(gain)] => Ok([lift, gamma, gain]),
            _ => Err(SolverError::InsufficientSamples {
                kind: SampleKind::Color,
                available: self.len(),
            }),
        }
    }
}

/// One luminance sample per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LumaPatches([Option<f32>; 3]);

impl LumaPatches {
    pub fn record(&mut self, stage: Stage, luma: f32) {
        self.0[stage.index()] = Some(luma);
    }

    /// Record the luminance (XYZ Y) of a picked Lab color.
    pub fn record_lab(&mut self, stage: Stage, lab: [f32; 3]) {
        self.record(stage, lab_to_xyz(lab).y);
    }

    pub fn get(&self, stage: Stage) -> Option<f32> {
        self.0[stage.index()]
    }

    pub fn len(&self) -> usize {
        self.0.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn complete(&self) -> Result<[f32; 3], SolverError> {
        match self.0 {
            [Some(lift), Some(gamma), Some(gain)] => Ok([lift, gamma, gain]),
            _ => Err(SolverError::InsufficientSamples {
                kind: SampleKind::Luma,
                available: self.len(),
            }),
        }
    }
}

fn rgb_of(v: &[f32; 4]) -> [f32; 3] {
    [v[1], v[2], v[3]]
}

fn set_rgb(v: &mut [f32; 4], rgb: [f32; 3]) {
    v[1..].copy_from_slice(&rgb);
}

fn mean(rgb: [f32; 3]) -> f32 {
    (rgb[0] + rgb[1] + rgb[2]) / 3.0
}

fn factor(params: &ColorBalanceParams, stage: Stage) -> f32 {
    params.value(stage, Channel::Factor)
}

/// Apply the factor settings of `params` to a raw sample.
fn through_factors(params: &ColorBalanceParams, rgb: [f32; 3]) -> [f32; 3] {
    let slope = factor(params, Stage::Gain);
    let offset = factor(params, Stage::Lift) - 1.0;
    let power = safe_inverse(factor(params, Stage::Gamma));
    rgb.map(|x| cdl(x, slope, offset, power))
}

/// Shift a solved vector so its ProPhoto luminance sits at neutral.
fn recentre_luminance(rgb: [f32; 3]) -> [f32; 3] {
    let y = RgbSpace::prophoto().luminance(rgb);
    rgb.map(|v| v - y + 1.0)
}

fn clamp(v: f32, (lo, hi): (f32, f32)) -> f32 {
    v.clamp(lo, hi)
}

/// Solve one stage's channels so a single sample becomes neutral after the
/// other stages' current settings.
pub fn neutralize(sample: &PatchSample, params: &ColorBalanceParams) -> ColorBalanceParams {
    let rgb = through_factors(params, sample.rgb);
    let grey = mean(rgb);
    let mut out = *params;

    let solved = match sample.stage {
        Stage::Lift => {
            let gain = rgb_of(&params.gain);
            [0, 1, 2].map(|c| grey - rgb[c] * gain[c])
        }
        Stage::Gamma => {
            let log_grey = grey.max(TINY).ln();
            if log_grey == 0.0 {
                tracing::warn!(grey, "gamma patch is already at unit level; gamma left unchanged");
                return out;
            }
            rgb.map(|v| v.max(TINY).ln() / log_grey)
        }
        Stage::Gain => rgb.map(|v| grey / v.max(TINY)),
    };

    set_rgb(out.stage_mut(sample.stage), recentre_luminance(solved));
    tracing::debug!(stage = ?sample.stage, values = ?rgb_of(out.stage(sample.stage)), "neutralized patch");
    out
}

/// Solve all three stages at once from one sample per stage.
///
/// Runs a fixed number of clamped relaxation passes (gain, then lift, then
/// gamma). The iteration count and clamp windows are part of the observable
/// behavior and are not a convergence test.
///
/// Each solved vector is re-centred on its own luminance. darktable's
/// color balance re-centres the gain vector on the lift vector's luminance
/// instead, so gain values differ from darktable's whenever the lift and
/// gain patches carry different casts.
///
/// A gamma patch whose graded mean is exactly 1 has no usable logarithm;
/// the parameters are then returned unchanged.
pub fn optimize(
    patches: &ColorPatches,
    params: &ColorBalanceParams,
) -> Result<ColorBalanceParams, SolverError> {
    let [lift_patch, gamma_patch, gain_patch] = patches.complete()?;

    let s_lift = through_factors(params, lift_patch);
    let s_gamma = through_factors(params, gamma_patch);
    let s_gain = through_factors(params, gain_patch);
    let grey_lift = mean(s_lift).max(TINY);
    let log_grey_gamma = mean(s_gamma).max(TINY).ln();
    let grey_gain = mean(s_gain).max(TINY);
    if log_grey_gamma == 0.0 {
        tracing::warn!(
            grey = mean(s_gamma),
            "gamma patch is already at unit level; optimization skipped"
        );
        return Ok(*params);
    }

    let mut lift = rgb_of(&params.lift).map(|v| v - 1.0);
    let mut gamma = rgb_of(&params.gamma);
    let mut gain = rgb_of(&params.gain);

    for _ in 0..OPTIMIZE_ITERATIONS {
        for c in 0..3 {
            gain[c] = clamp(
                (grey_gain.powf(gamma[c]) - lift[c]) / s_gain[c].max(TINY),
                GAIN_BOUNDS,
            );
        }
        for c in 0..3 {
            lift[c] = clamp(
                grey_lift.powf(gamma[c]) - s_lift[c].max(TINY) * gain[c],
                LIFT_BOUNDS,
            );
        }
        for c in 0..3 {
            gamma[c] = clamp(
                (gain[c] * s_gamma[c] + lift[c]).max(TINY).ln() / log_grey_gamma,
                GAMMA_BOUNDS,
            );
        }
    }

    let mut out = *params;
    set_rgb(&mut out.lift, recentre_luminance(lift));
    set_rgb(&mut out.gamma, recentre_luminance(gamma));
    set_rgb(&mut out.gain, recentre_luminance(gain));
    tracing::debug!(lift = ?lift, gamma = ?gamma, gain = ?gain, "optimized color patches");
    Ok(out)
}

/// Solve the three factors from one luminance sample per stage.
pub fn optimize_luma(
    patches: &LumaPatches,
    params: &ColorBalanceParams,
) -> Result<ColorBalanceParams, SolverError> {
    let [y_lift, y_gamma, y_gain] = patches.complete()?;
    let log_grey = MIDDLE_GREY.ln();
    let f = Channel::Factor.index();
    let mut out = *params;

    for _ in 0..OPTIMIZE_ITERATIONS {
        out.gain[f] = clamp(out.lift[f] / y_gain.max(TINY), FACTOR_BOUNDS);
        out.lift[f] = clamp(-out.gain[f] * y_lift + 1.0, FACTOR_BOUNDS);
        out.gamma[f] = clamp(
            (out.gain[f] * y_gamma + out.lift[f] - 1.0).max(TINY).ln() / log_grey,
            FACTOR_BOUNDS,
        );
    }
    tracing::debug!(
        lift = out.lift[f],
        gamma = out.gamma[f],
        gain = out.gain[f],
        "optimized luma patches"
    );
    Ok(out)
}

/// Lift factor that maps the darkest picked luminance to black.
pub fn auto_lift_factor(luma: f32, params: &ColorBalanceParams) -> ColorBalanceParams {
    let mut out = *params;
    out.lift[Channel::Factor.index()] = -factor(params, Stage::Gain) * luma + 1.0;
    out
}

/// Gamma factor that maps the picked mid-tone luminance to middle grey.
pub fn auto_gamma_factor(luma: f32, params: &ColorBalanceParams) -> ColorBalanceParams {
    let mut out = *params;
    let graded = factor(params, Stage::Gain) * luma + factor(params, Stage::Lift) - 1.0;
    out.gamma[Channel::Factor.index()] = graded.max(TINY).ln() / MIDDLE_GREY.ln();
    out
}

/// Gain factor that maps the brightest picked luminance to white.
pub fn auto_gain_factor(luma: f32, params: &ColorBalanceParams) -> ColorBalanceParams {
    let mut out = *params;
    out.gain[Channel::Factor.index()] = factor(params, Stage::Lift) / luma.max(TINY);
    out
}

/// Set the contrast fulcrum to the graded luminance of a picked color.
pub fn auto_grey(rgb: [f32; 3], params: &ColorBalanceParams) -> ColorBalanceParams {
    let f = Channel::Factor.index();
    let graded: [f32; 3] = [1, 2, 3].map(|c| {
        let offset = params.lift[c] + params.lift[f] - 2.0;
        let slope = params.gain[c] * params.gain[f];
        let power = safe_inverse(params.gamma[c] * params.gamma[f]);
        cdl(rgb[c - 1], slope, offset, power).clamp(0.0, 1.0)
    });
    let mut out = *params;
    out.grey = RgbSpace::prophoto().luminance(graded) * 100.0;
    out
}

/// Interactive auto-balance session.
///
/// Remembers picked patches across calls and commits every solver result
/// to the stage as one update.
#[derive(Debug, Clone, Default)]
pub struct AutoBalance {
    color: ColorPatches,
    luma: LumaPatches,
}

impl AutoBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color_patches(&self) -> &ColorPatches {
        &self.color
    }

    pub fn luma_patches(&self) -> &LumaPatches {
        &self.luma
    }

    /// Record a picked color for `stage` and neutralize that stage.
    pub fn pick_color(&mut self, stage: Stage, lab: [f32; 3], grading: &mut GradingStage) {
        let sample = PatchSample::from_lab(stage, lab);
        self.color.record(sample);
        let updated = neutralize(&sample, grading.params());
        grading.set_params(updated);
    }

    /// Record a picked luminance for `stage` and fit that stage's factor.
    ///
    /// Pass the darkest pixel of the pick for lift, the mean for gamma and
    /// the brightest for gain.
    pub fn pick_luma(&mut self, stage: Stage, lab: [f32; 3], grading: &mut GradingStage) {
        self.luma.record_lab(stage, lab);
        let luma = lab_to_xyz(lab).y;
        let updated = match stage {
            Stage::Lift => auto_lift_factor(luma, grading.params()),
            Stage::Gamma => auto_gamma_factor(luma, grading.params()),
            Stage::Gain => auto_gain_factor(luma, grading.params()),
        };
        grading.set_params(updated);
    }

    /// Set the contrast fulcrum from a picked color.
    pub fn pick_grey(&self, lab: [f32; 3], grading: &mut GradingStage) {
        let rgb = PatchSample::from_lab(Stage::Gamma, lab).rgb;
        let updated = auto_grey(rgb, grading.params());
        grading.set_params(updated);
    }

    /// Run the color optimizer. On rejection the stage is left untouched.
    pub fn optimize_color(&self, grading: &mut GradingStage) -> Result<(), SolverError> {
        let updated = optimize(&self.color, grading.params()).inspect_err(|e| {
            tracing::warn!(error = %e, "color optimization rejected");
        })?;
        grading.set_params(updated);
        Ok(())
    }

    /// Run the luma optimizer. On rejection the stage is left untouched.
    pub fn optimize_luma(&self, grading: &mut GradingStage) -> Result<(), SolverError> {
        let updated = optimize_luma(&self.luma, grading.params()).inspect_err(|e| {
            tracing::warn!(error = %e, "luma optimization rejected");
        })?;
        grading.set_params(updated);
        Ok(())
    }

    /// Forget all picked patches.
    pub fn clear(&mut self) {
        self.color.clear();
        self.luma.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn neutral_patches(level: [f32; 3]) -> ColorPatches {
        let mut patches = ColorPatches::default();
        for (stage, v) in Stage::ALL.into_iter().zip(level) {
            patches.record(PatchSample::new(stage, [v; 3]));
        }
        patches
    }

    fn assert_neutral(v: &[f32; 4], what: &str) {
        for c in 1..4 {
            assert!((v[c] - 1.0).abs() < EPSILON, "{what} channel {c}: {:.8}", v[c]);
        }
    }

    #[test]
    fn test_optimize_rejects_two_samples() {
        let mut patches = ColorPatches::default();
        patches.record(PatchSample::new(Stage::Lift, [0.05, 0.04, 0.03]));
        patches.record(PatchSample::new(Stage::Gain, [0.9, 0.8, 0.7]));
        let params = ColorBalanceParams::default();
        assert_eq!(
            optimize(&patches, &params),
            Err(SolverError::InsufficientSamples {
                kind: SampleKind::Color,
                available: 2
            })
        );
    }

    #[test]
    fn test_rejection_message_names_the_samples() {
        let err = optimize_luma(&LumaPatches::default(), &ColorBalanceParams::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("you need to select 3 luma samples first"));
    }

    #[test]
    fn test_optimize_keeps_neutral_patches_neutral() {
        let params = ColorBalanceParams::default();
        let out = optimize(&neutral_patches([0.05, 0.18, 0.9]), &params).unwrap();
        for (v, what) in [(&out.lift, "lift"), (&out.gamma, "gamma"), (&out.gain, "gain")] {
            assert!(
                (v[1] - v[2]).abs() < EPSILON && (v[2] - v[3]).abs() < EPSILON,
                "{what}: {v:?}"
            );
        }
    }

    #[test]
    fn test_optimize_stays_within_bounds() {
        let mut patches = ColorPatches::default();
        patches.record(PatchSample::new(Stage::Lift, [0.08, 0.03, 0.01]));
        patches.record(PatchSample::new(Stage::Gamma, [0.3, 0.18, 0.1]));
        patches.record(PatchSample::new(Stage::Gain, [0.95, 0.7, 0.5]));
        let out = optimize(&patches, &ColorBalanceParams::default()).unwrap();
        for c in 1..4 {
            assert!((0.5..=1.5).contains(&out.lift[c]), "lift {:?}", out.lift);
            assert!((0.0..=2.0).contains(&out.gamma[c]), "gamma {:?}", out.gamma);
            assert!((0.5..=1.5).contains(&out.gain[c]), "gain {:?}", out.gain);
        }
        assert_eq!(out.lift[0], 1.0);
    }

    #[test]
    fn test_optimize_unit_gamma_patch_leaves_params_unchanged() {
        let mut patches = ColorPatches::default();
        patches.record(PatchSample::new(Stage::Lift, [0.05; 3]));
        patches.record(PatchSample::new(Stage::Gamma, [1.0; 3]));
        patches.record(PatchSample::new(Stage::Gain, [1.0; 3]));
        let mut params = ColorBalanceParams::default();
        params.gain[2] = 1.1;
        let out = optimize(&patches, &params).unwrap();
        assert_eq!(out, params);
        for v in out.lift.iter().chain(&out.gamma).chain(&out.gain) {
            assert!(v.is_finite(), "{out:?}");
        }
    }

    #[test]
    fn test_neutralize_grey_sample_is_neutral() {
        let params = ColorBalanceParams::default();
        for stage in [Stage::Lift, Stage::Gain] {
            let out = neutralize(&PatchSample::new(stage, [0.4; 3]), &params);
            assert_neutral(out.stage(stage), &format!("{stage:?}"));
        }
    }

    #[test]
    fn test_neutralize_gain_counters_cast() {
        let params = ColorBalanceParams::default();
        let out = neutralize(&PatchSample::new(Stage::Gain, [0.8, 0.6, 0.4]), &params);
        assert!(out.gain[1] < out.gain[2] && out.gain[2] < out.gain[3], "{:?}", out.gain);
        assert_eq!(out.lift, params.lift);
    }

    #[test]
    fn test_neutralize_gamma_at_unit_grey_is_noop() {
        let params = ColorBalanceParams::default();
        let out = neutralize(&PatchSample::new(Stage::Gamma, [1.0; 3]), &params);
        assert_eq!(out, params);
    }

    #[test]
    fn test_luma_optimizer_fixed_point() {
        let mut patches = LumaPatches::default();
        patches.record(Stage::Lift, 0.0);
        patches.record(Stage::Gamma, MIDDLE_GREY);
        patches.record(Stage::Gain, 1.0);
        let out = optimize_luma(&patches, &ColorBalanceParams::default()).unwrap();
        assert_neutral(&[0.0, out.lift[0], out.gamma[0], out.gain[0]], "factors");
    }

    #[test]
    fn test_luma_optimizer_clamps_factors() {
        let mut patches = LumaPatches::default();
        patches.record(Stage::Lift, 0.5);
        patches.record(Stage::Gamma, 0.01);
        patches.record(Stage::Gain, 0.1);
        let out = optimize_luma(&patches, &ColorBalanceParams::default()).unwrap();
        for v in [out.lift[0], out.gamma[0], out.gain[0]] {
            assert!((0.0..=2.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn test_single_factor_autos() {
        let params = ColorBalanceParams::default();
        assert!((auto_lift_factor(0.05, &params).lift[0] - 0.95).abs() < EPSILON);
        assert!((auto_gain_factor(0.8, &params).gain[0] - 1.25).abs() < EPSILON);
        assert!((auto_gamma_factor(MIDDLE_GREY, &params).gamma[0] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_auto_grey_reads_graded_luminance() {
        let params = ColorBalanceParams::default();
        let out = auto_grey([0.18; 3], &params);
        assert!((out.grey - 18.0).abs() < 1e-2, "grey {}", out.grey);

        let mut brighter = params;
        brighter.gain[0] = 2.0;
        assert!((auto_grey([0.18; 3], &brighter).grey - 36.0).abs() < 1e-2);
    }

    #[test]
    fn test_session_commits_and_rejects() {
        let mut stage = GradingStage::default();
        let mut session = AutoBalance::new();
        session.pick_color(Stage::Gain, [80.0, 10.0, 20.0], &mut stage);
        assert_eq!(stage.revision(), 1);
        assert_eq!(session.color_patches().len(), 1);

        let before = *stage.params();
        assert!(session.optimize_color(&mut stage).is_err());
        assert_eq!(*stage.params(), before);
        assert_eq!(stage.revision(), 1);

        session.pick_color(Stage::Lift, [10.0, 5.0, 5.0], &mut stage);
        session.pick_color(Stage::Gamma, [45.0, 8.0, 12.0], &mut stage);
        session.optimize_color(&mut stage).unwrap();
        assert_eq!(stage.revision(), 4);
    }
}
