//! Bolus dose math and the delayed half of an extended bolus.

pub mod calculator;
pub mod extended;

pub use calculator::{DoseCalculator, DoseRequest, carb_bolus, correction_bolus, split_extended};
pub use extended::{ExtendedBolusSchedule, ScheduleStep};
