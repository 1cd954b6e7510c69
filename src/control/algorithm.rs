//! Basal control policy
//!
//! Runs once per tick with a connected CGM reading and decides what the
//! pump's basal rate should be.  Rules are evaluated in priority order:
//!
//! 1. glucose at or below the low limit  -> basal 0
//! 2. above target while basal is 0      -> resume profile rate
//! 3. basal drifted from profile rate    -> correct to profile rate
//! 4. otherwise                          -> no change

use crate::profile::Profile;

/// Decision for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    SuspendBasal,
    ResumeBasal(f64),
    CorrectBasal(f64),
    NoChange,
}

impl ControlAction {
    /// Rate the pump should switch to, if any.
    pub fn target_rate(self) -> Option<f64> {
        match self {
            Self::SuspendBasal => Some(0.0),
            Self::ResumeBasal(r) | Self::CorrectBasal(r) => Some(r),
            Self::NoChange => None,
        }
    }

    /// History text for the decision, if it is worth logging.
    pub fn describe(self) -> Option<String> {
        match self {
            Self::SuspendBasal => {
                Some("Low glucose detected. Basal rate pumping suspended.".to_owned())
            }
            Self::ResumeBasal(_) => Some("Glucose stable. Resumed basal rate pumping.".to_owned()),
            Self::CorrectBasal(r) => Some(format!("Profile basal rate set manually to {r}.")),
            Self::NoChange => None,
        }
    }
}

/// Basal control policy
pub struct ControlAlgorithm {
    low_glucose_limit: f64,
}

impl ControlAlgorithm {
    pub fn new(low_glucose_limit: f64) -> Self {
        Self { low_glucose_limit }
    }

    pub fn decide(&self, glucose: f64, profile: &Profile, current_rate: f64) -> ControlAction {
        if glucose <= self.low_glucose_limit {
            ControlAction::SuspendBasal
        } else if glucose > profile.target_glucose && current_rate == 0.0 {
            ControlAction::ResumeBasal(profile.basal_rate)
        } else if current_rate != 0.0 && current_rate != profile.basal_rate {
            ControlAction::CorrectBasal(profile.basal_rate)
        } else {
            ControlAction::NoChange
        }
    }
}
