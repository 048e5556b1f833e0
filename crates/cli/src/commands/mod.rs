//! CLI command implementations

pub mod calibration;
pub mod health;
pub mod predict;
