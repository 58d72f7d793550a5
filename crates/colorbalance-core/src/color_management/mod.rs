//! Color management: the bridge between the working Lab space and the RGB
//! spaces the grading kernel operates in.

pub mod color_space;
pub mod lab;
pub mod transfer;

pub use color_space::{RgbSpace, WorkingSpace};
pub use lab::{D50_WHITE, lab_to_xyz, xyz_to_lab};
