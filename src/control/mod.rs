//! Automated basal control.

pub mod algorithm;

pub use algorithm::{ControlAction, ControlAlgorithm};
