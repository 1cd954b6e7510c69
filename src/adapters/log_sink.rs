//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured device events through
//! the `log` facade (rendered by whatever backend the binary installs).
//! Per-tick delivery chatter goes to `debug`; history entries, alerts and
//! power changes go to `info` or above.

use log::{debug, error, info, warn};

use crate::app::events::{DeviceEvent, LogKind};
use crate::app::ports::EventSink;

/// Adapter that logs every [`DeviceEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Snapshot(s) => {
                info!(
                    "TELEM | {} | power={:?} | BG={} | IOB={:.2}U | basal={:.2}U/h | \
                     pump={:?} | cart={:.1}U | batt={:.0}% | alerts={}",
                    s.time,
                    s.power,
                    s.glucose,
                    s.iob,
                    s.basal_rate,
                    s.pump_mode,
                    s.insulin_remaining,
                    s.battery_level * 100.0,
                    s.active_alerts.len(),
                );
            }
            DeviceEvent::Log { kind, message } => match kind {
                LogKind::Error => error!("HISTORY | {kind} | {message}"),
                LogKind::Warning => warn!("HISTORY | {kind} | {message}"),
                _ => info!("HISTORY | {kind} | {message}"),
            },
            DeviceEvent::Glucose { at, mmol } => debug!("CGM | {at} | {mmol:.2} mmol/L"),
            DeviceEvent::Insulin { at, units } => debug!("IOB | {at} | {units:.3} U"),
            DeviceEvent::BolusProgress { remaining } => {
                debug!("BOLUS | {remaining:.2} U remaining");
            }
            DeviceEvent::BolusCancelled { undelivered } => {
                warn!("BOLUS | cancelled, {undelivered:.2} U undelivered");
            }
            DeviceEvent::ExtendedCountdown { minutes_remaining } => {
                debug!("EXTENDED | {minutes_remaining} min remaining");
            }
            DeviceEvent::AlertRaised(kind) => warn!("ALERT | raised: {kind} | {}", kind.message()),
            DeviceEvent::AlertCleared(kind) => info!("ALERT | cleared: {kind}"),
            DeviceEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
        }
    }
}
