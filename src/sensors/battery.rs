//! Battery gauge model.
//!
//! Level runs from 1.0 (full) to 0.0 (dead) and drains by a fixed step
//! every tick the device is monitoring.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryModel {
    level: f64,
    critical_level: f64,
}

impl BatteryModel {
    /// A fully charged battery.
    pub fn new(critical_level: f64) -> Self {
        Self {
            level: 1.0,
            critical_level,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Drain by `step`, clamping at zero.  Returns `true` only on the call
    /// that empties the battery.
    pub fn drain(&mut self, step: f64) -> bool {
        let was_alive = self.level > 0.0;
        self.level = (self.level - step.max(0.0)).max(0.0);
        was_alive && self.level <= 0.0
    }

    pub fn charge(&mut self) {
        self.level = 1.0;
    }

    pub fn is_critical(&self) -> bool {
        self.level <= self.critical_level
    }

    pub fn is_dead(&self) -> bool {
        self.level <= 0.0
    }
}
