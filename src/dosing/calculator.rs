//! Bolus calculator.
//!
//! The dose math is a handful of free functions; [`DoseCalculator`] adds
//! the only state the workflow needs: the last request and an optional
//! user override of its result.

use log::info;
use serde::Serialize;

use crate::error::{Result, ValidationError};
use crate::profile::Profile;

// ═══════════════════════════════════════════════════════════════
//  Dose math
// ═══════════════════════════════════════════════════════════════

/// Insulin needed to bring `glucose` down to `target`.  Never negative.
pub fn correction_bolus(glucose: f64, target: f64, correction_factor: f64) -> f64 {
    if correction_factor > 0.0 {
        ((glucose - target) / correction_factor).max(0.0)
    } else {
        0.0
    }
}

/// Insulin needed to cover `carbs` grams.
pub fn carb_bolus(carbs: f64, carb_ratio: f64, correction_factor: f64) -> f64 {
    if carb_ratio > 0.0 && correction_factor > 0.0 {
        carbs * carb_ratio / correction_factor
    } else {
        0.0
    }
}

/// Split `total` into an immediate and a delayed part.  `(0, 0)` when
/// `pct_now` is outside `[0, 100]`.
pub fn split_extended(total: f64, pct_now: f64) -> (f64, f64) {
    if !(0.0..=100.0).contains(&pct_now) {
        return (0.0, 0.0);
    }
    let now = total * pct_now / 100.0;
    (now, total - now)
}

// ═══════════════════════════════════════════════════════════════
//  Calculator state
// ═══════════════════════════════════════════════════════════════

/// Inputs of the most recent calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoseRequest {
    pub glucose: f64,
    pub carbs: f64,
}

#[derive(Debug, Clone)]
pub struct DoseCalculator {
    max_override: f64,
    override_dose: Option<f64>,
    last_request: Option<DoseRequest>,
}

impl DoseCalculator {
    pub fn new(max_override: f64) -> Self {
        Self {
            max_override,
            override_dose: None,
            last_request: None,
        }
    }

    /// Carb plus correction bolus for the given profile.
    pub fn total_bolus(&self, glucose: f64, carbs: f64, profile: &Profile) -> f64 {
        carb_bolus(carbs, profile.carb_ratio, profile.correction_factor)
            + correction_bolus(glucose, profile.target_glucose, profile.correction_factor)
    }

    /// The override when one is set, otherwise the calculated total.
    pub fn recommended_dose(&self, glucose: f64, carbs: f64, profile: &Profile) -> f64 {
        self.override_dose
            .unwrap_or_else(|| self.total_bolus(glucose, carbs, profile))
    }

    /// Fresh calculation entry point: drops any override, remembers the
    /// request and returns the calculated total.
    pub fn calculate(&mut self, glucose: f64, carbs: f64, profile: &Profile) -> Result<f64> {
        if !glucose.is_finite() || glucose < 0.0 {
            return Err(ValidationError::InvalidInput("glucose").into());
        }
        if !carbs.is_finite() || carbs < 0.0 {
            return Err(ValidationError::InvalidInput("carbs").into());
        }
        self.override_dose = None;
        self.last_request = Some(DoseRequest { glucose, carbs });
        let dose = self.total_bolus(glucose, carbs, profile);
        info!(
            "BOLUS CALC: glucose={:.1} carbs={:.0}g -> {:.2} U",
            glucose, carbs, dose
        );
        Ok(dose)
    }

    pub fn validate_override(&self, dose: f64) -> bool {
        dose > 0.0 && dose <= self.max_override
    }

    /// Replace the recommendation with `dose` until the next `calculate`.
    pub fn override_dose(&mut self, dose: f64) -> Result<f64> {
        if !self.validate_override(dose) {
            return Err(ValidationError::OverrideOutOfRange.into());
        }
        info!("BOLUS CALC: dose overridden to {:.2} U", dose);
        self.override_dose = Some(dose);
        Ok(dose)
    }

    pub fn is_overridden(&self) -> bool {
        self.override_dose.is_some()
    }

    pub fn last_request(&self) -> Option<DoseRequest> {
        self.last_request
    }

    /// Dose that `confirm` would deliver, if anything has been calculated.
    pub fn pending_dose(&self, profile: &Profile) -> Option<(DoseRequest, f64)> {
        self.last_request
            .map(|r| (r, self.recommended_dose(r.glucose, r.carbs, profile)))
    }
}
