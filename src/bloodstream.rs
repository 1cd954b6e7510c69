//! Insulin-on-board tracking.

use serde::Serialize;

use crate::error::{Result, ValidationError};

/// Insulin present in the bloodstream that has not yet been absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bloodstream {
    iob: f64,
}

impl Bloodstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units currently on board.
    pub fn iob(&self) -> f64 {
        self.iob
    }

    /// Add delivered insulin.  Negative or non-finite amounts are rejected
    /// without touching the balance.
    pub fn inject(&mut self, units: f64) -> Result<()> {
        if !units.is_finite() || units < 0.0 {
            return Err(ValidationError::NegativeUnits.into());
        }
        self.iob += units;
        Ok(())
    }

    /// Remove absorbed insulin, flooring at zero.
    pub fn absorb(&mut self, units: f64) {
        self.iob = (self.iob - units.max(0.0)).max(0.0);
    }
}
