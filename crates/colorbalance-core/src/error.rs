//! Error types for the color balance core.

use std::fmt;

/// Which kind of patch set a solver run was missing samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// RGB patches for the per-channel optimizer.
    Color,
    /// Luminance patches for the factor optimizer.
    Luma,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color => write!(f, "color"),
            Self::Luma => write!(f, "luma"),
        }
    }
}

/// Rejections reported by the auto-balance solver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolverError {
    #[error("you need to select 3 {kind} samples first ({available} available)")]
    InsufficientSamples { kind: SampleKind, available: usize },
}

/// Mismatches between a region layout and the buffers handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("row stride {row_stride} is smaller than width {width}")]
    StrideTooSmall { width: u32, row_stride: u32 },
    #[error("{which} buffer holds {actual} pixels, layout needs {expected}")]
    LengthMismatch {
        which: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("f32 buffer of length {0} is not a whole number of 4-channel pixels")]
    Unaligned(usize),
}

/// Failures loading or saving a parameter preset.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("invalid parameter JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
