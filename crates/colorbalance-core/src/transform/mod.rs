//! The color balance transform: parameters, coefficient derivation, the
//! per-pixel kernel, and the stage that owns them.

pub mod coefficients;
pub mod kernel;
pub mod lanes;
pub mod params;
pub mod stage;
