//! Safety monitor.
//!
//! The monitor runs **every monitoring tick, before the control decision**
//! and keeps the device's [`AlertRegistry`].  It never touches the pump
//! itself: it returns a [`SafetyReport`] and the device service acts on
//! `force_suspend`.
//!
//! ## Evaluation order
//!
//! 1. Battery critical      -> raise BatteryLow (cleared on charge)
//! 2. Cartridge low         -> raise InsulinLow (cleared on refill)
//! 3. CGM link              -> raise/reset CgmDisconnected
//! 4. Pump error signal     -> raise/reset PumpOcclusion
//! 5. Glucose:
//!    - disconnected        -> force bolus suspension
//!    - below low limit     -> force suspension, raise GlucoseLow
//!    - above target+margin -> raise GlucoseHigh
//!    - within target±band  -> reset GlucoseHigh and GlucoseLow
//!
//! Between the band and the thresholds nothing changes, so glucose alerts
//! do not flap around a single limit.

use log::{error, info};

use crate::alerts::{AlertKind, AlertRegistry};
use crate::config::SystemConfig;
use crate::sensors::GlucoseSample;

/// Everything the monitor looks at for one tick.
#[derive(Debug, Clone, Copy)]
pub struct SafetyInputs {
    pub battery_critical: bool,
    pub reserve_low: bool,
    pub glucose: GlucoseSample,
    pub cgm_link_up: bool,
    pub pump_error: bool,
    pub target_glucose: f64,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SafetyReport {
    /// Active alert bitmask after evaluation.
    pub active: u8,
    /// Alerts that went inactive -> active this tick.
    pub raised: u8,
    /// Alerts that went active -> inactive this tick.
    pub cleared: u8,
    /// The pump must suspend bolus delivery now.
    pub force_suspend: bool,
}

impl SafetyReport {
    pub fn raised_kinds(&self) -> impl Iterator<Item = AlertKind> + '_ {
        AlertKind::ALL
            .into_iter()
            .filter(|k| self.raised & k.mask() != 0)
    }

    pub fn cleared_kinds(&self) -> impl Iterator<Item = AlertKind> + '_ {
        AlertKind::ALL
            .into_iter()
            .filter(|k| self.cleared & k.mask() != 0)
    }
}

/// Safety monitor.
pub struct SafetyMonitor {
    registry: AlertRegistry,
    low_glucose_limit: f64,
    high_glucose_margin: f64,
    in_range_band: f64,
}

impl SafetyMonitor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            registry: AlertRegistry::new(),
            low_glucose_limit: config.low_glucose_limit,
            high_glucose_margin: config.high_glucose_margin,
            in_range_band: config.in_range_band,
        }
    }

    /// Evaluate all conditions in the fixed order and report changes.
    pub fn evaluate(&mut self, inputs: &SafetyInputs) -> SafetyReport {
        let mut report = SafetyReport::default();

        // ── Battery / cartridge (latched until serviced) ─────────
        if inputs.battery_critical {
            self.raise(AlertKind::BatteryLow, &mut report);
        }
        if inputs.reserve_low {
            self.raise(AlertKind::InsulinLow, &mut report);
        }

        // ── Fault lines ──────────────────────────────────────────
        self.eval_alert(AlertKind::CgmDisconnected, !inputs.cgm_link_up, &mut report);
        self.eval_alert(AlertKind::PumpOcclusion, inputs.pump_error, &mut report);

        // ── Glucose ──────────────────────────────────────────────
        match inputs.glucose {
            GlucoseSample::Disconnected => report.force_suspend = true,
            GlucoseSample::Reading(g) if g < self.low_glucose_limit => {
                report.force_suspend = true;
                self.raise(AlertKind::GlucoseLow, &mut report);
            }
            GlucoseSample::Reading(g) if g > inputs.target_glucose + self.high_glucose_margin => {
                self.raise(AlertKind::GlucoseHigh, &mut report);
            }
            GlucoseSample::Reading(g) if (g - inputs.target_glucose).abs() <= self.in_range_band => {
                self.reset(AlertKind::GlucoseHigh, &mut report);
                self.reset(AlertKind::GlucoseLow, &mut report);
            }
            GlucoseSample::Reading(_) => {}
        }

        report.active = self.registry.bits();
        report
    }

    /// External clear, e.g. after charging or refilling.
    pub fn reset_alert(&mut self, kind: AlertKind) -> bool {
        let was = self.registry.reset(kind);
        if was {
            info!("ALERT CLEARED: {kind}");
        }
        was
    }

    pub fn registry(&self) -> &AlertRegistry {
        &self.registry
    }

    pub fn is_active(&self, kind: AlertKind) -> bool {
        self.registry.is_active(kind)
    }

    // ── Internal ──────────────────────────────────────────────

    fn eval_alert(&mut self, kind: AlertKind, condition: bool, report: &mut SafetyReport) {
        if condition {
            self.raise(kind, report);
        } else {
            self.reset(kind, report);
        }
    }

    fn raise(&mut self, kind: AlertKind, report: &mut SafetyReport) {
        if self.registry.raise(kind) {
            error!("ALERT RAISED: {kind}");
            report.raised |= kind.mask();
        }
    }

    fn reset(&mut self, kind: AlertKind, report: &mut SafetyReport) {
        if self.registry.reset(kind) {
            info!("ALERT CLEARED: {kind}");
            report.cleared |= kind.mask();
        }
    }
}
