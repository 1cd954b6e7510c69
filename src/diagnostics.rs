//! Runtime delivery metrics.
//!
//! Accumulated by the device service every tick and published in each
//! snapshot.  Comparing `*_requested` with `*_delivered` is how callers
//! detect a short cartridge: the pump never reports it as an error.

use serde::{Deserialize, Serialize};

use crate::drivers::pump::PumpTick;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeMetrics {
    /// Monitoring ticks executed.
    pub ticks: u64,
    pub bolus_requested: f64,
    pub bolus_delivered: f64,
    pub basal_requested: f64,
    pub basal_delivered: f64,
    /// Delivery requests refused because of pump or glucose state.
    pub blocked_requests: u32,
    /// Alert activations (re-raises after a reset count again).
    pub alerts_raised: u32,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one pump tick into the totals.
    pub fn record_tick(&mut self, tick: &PumpTick) {
        self.ticks += 1;
        self.bolus_requested += tick.bolus_requested;
        self.bolus_delivered += tick.bolus_delivered;
        self.basal_requested += tick.basal_requested;
        self.basal_delivered += tick.basal_delivered;
    }

    pub fn record_blocked(&mut self) {
        self.blocked_requests = self.blocked_requests.saturating_add(1);
    }

    pub fn record_alerts(&mut self, newly_raised: u32) {
        self.alerts_raised = self.alerts_raised.saturating_add(newly_raised);
    }

    /// Units that were asked for but not available in the cartridge.
    pub fn shortfall(&self) -> f64 {
        ((self.bolus_requested - self.bolus_delivered) + (self.basal_requested - self.basal_delivered))
            .max(0.0)
    }

    pub fn total_delivered(&self) -> f64 {
        self.bolus_delivered + self.basal_delivered
    }
}
