//! Simulated sensors: the battery gauge and the continuous glucose monitor.
//!
//! Both are plain models owned by the device service; each tick the
//! service drains the battery and asks the CGM for a fresh sample.

pub mod battery;
pub mod cgm;

pub use battery::BatteryModel;
pub use cgm::{CgmParams, GlucoseModel, GlucoseSample};
