//! Grading tools built on top of the transform: auto-balance and wheels.

pub mod auto_balance;
pub mod wheels;
