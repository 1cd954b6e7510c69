//! Therapy profile: the per-patient parameters every dosing decision reads.
//!
//! The core never mutates a profile; it is swapped wholesale through
//! [`DeviceCommand::SwitchProfile`](crate::app::commands::DeviceCommand).

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Active therapy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Display name.
    pub name: String,
    /// Basal delivery rate (U/h).
    pub basal_rate: f64,
    /// Carbohydrate ratio, applied as `carbs * carb_ratio / correction_factor`.
    pub carb_ratio: f64,
    /// Glucose drop per unit of insulin (mmol/L per U).
    pub correction_factor: f64,
    /// Target glucose (mmol/L).
    pub target_glucose: f64,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "Default".to_owned(),
            basal_rate: 0.8,
            carb_ratio: 0.09,
            correction_factor: 2.5,
            target_glucose: 5.5,
        }
    }
}

impl Profile {
    /// Reject profiles that would make the dose math meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.basal_rate.is_finite() || self.basal_rate < 0.0 {
            return Err(ValidationError::InvalidInput("basal rate").into());
        }
        if !self.carb_ratio.is_finite() || self.carb_ratio < 0.0 {
            return Err(ValidationError::InvalidInput("carb ratio").into());
        }
        if !self.correction_factor.is_finite() || self.correction_factor <= 0.0 {
            return Err(ValidationError::InvalidInput("correction factor").into());
        }
        if !self.target_glucose.is_finite() || self.target_glucose <= 0.0 {
            return Err(ValidationError::InvalidInput("target glucose").into());
        }
        Ok(())
    }
}
