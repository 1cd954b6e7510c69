//! Insulin cartridge model.
//!
//! ## Contract
//!
//! `withdraw` is the only way insulin leaves the cartridge.  It never
//! fails: a short cartridge degrades the delivery to whatever is left.

use serde::Serialize;

use crate::config::SystemConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InsulinReserve {
    remaining: f64,
    capacity: f64,
    low_threshold: f64,
}

impl InsulinReserve {
    /// A full cartridge.
    pub fn new(capacity: f64, low_threshold: f64) -> Self {
        Self {
            remaining: capacity,
            capacity,
            low_threshold,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.reservoir_capacity_units, config.reservoir_low_units)
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn is_low(&self) -> bool {
        self.remaining <= self.low_threshold
    }

    pub fn is_empty(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Take up to `requested` units.  Returns what was actually released.
    pub fn withdraw(&mut self, requested: f64) -> f64 {
        if !requested.is_finite() || requested <= 0.0 {
            return 0.0;
        }
        let delivered = requested.min(self.remaining);
        self.remaining -= delivered;
        delivered
    }

    pub fn refill(&mut self) {
        self.remaining = self.capacity;
    }
}
