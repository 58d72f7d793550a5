//! Colorbalance Core: domain layer for the lift/gamma/gain color balance stage.
//!
//! This crate contains the color-space bridge, the parameter record and its
//! coefficient derivation, the per-pixel grading kernel with its CPU backends,
//! and the auto-balance solver. No GPU or framework dependencies.

pub mod backend;
pub mod color_management;
pub mod error;
pub mod grading;
pub mod image;
pub mod transform;

// Re-exports for convenience.
pub use backend::{CpuBackend, process_region};
pub use error::{BufferError, ParamsError, SampleKind, SolverError};
pub use grading::auto_balance::{AutoBalance, ColorPatches, LumaPatches, PatchSample};
pub use image::{LabImage, RegionLayout};
pub use transform::coefficients::{DerivedCoefficients, derive};
pub use transform::kernel::transform_pixel;
pub use transform::params::{Channel, ColorBalanceParams, LegacyParamsV1, Mode, Stage};
pub use transform::stage::{BatchUpdate, GradingStage, SharedStage};
