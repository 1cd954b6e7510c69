//! Outbound device events.
//!
//! The [`Device`](super::service::Device) and the components it drives
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them: log lines,
//! JSON records, a UI model.

use core::fmt;

use serde::Serialize;

use crate::alerts::AlertKind;
use crate::diagnostics::RuntimeMetrics;
use crate::drivers::pump::{ActiveBolus, PumpMode};
use crate::fsm::StateId;
use crate::scheduler::SimTime;
use crate::sensors::GlucoseSample;

/// Category of a log event, mirroring the device's event history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogKind {
    Info,
    Warning,
    Error,
    /// User-initiated bolus action.
    Manual,
    ExtendedBolus,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Manual => "Manual",
            Self::ExtendedBolus => "Extended Bolus",
        };
        f.write_str(s)
    }
}

/// Structured events emitted by the device core.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// Free-form history entry.
    Log { kind: LogKind, message: String },

    /// CGM reading recorded (connected samples only).
    Glucose { at: SimTime, mmol: f64 },

    /// Insulin-on-board recorded.
    Insulin { at: SimTime, units: f64 },

    /// Units still to deliver on the active bolus.
    BolusProgress { remaining: f64 },

    /// A bolus (and any pending extended remainder) was cancelled.
    BolusCancelled { undelivered: f64 },

    /// Minutes until the extended remainder is delivered; 0 when done or cancelled.
    ExtendedCountdown { minutes_remaining: u32 },

    AlertRaised(AlertKind),
    AlertCleared(AlertKind),

    /// The power FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// End-of-tick snapshot.
    Snapshot(DeviceSnapshot),
}

impl DeviceEvent {
    pub fn log(kind: LogKind, message: impl Into<String>) -> Self {
        Self::Log {
            kind,
            message: message.into(),
        }
    }
}

/// A point-in-time view of the whole device, published once per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub time: SimTime,
    pub power: StateId,
    pub glucose: GlucoseSample,
    pub battery_level: f64,
    pub insulin_remaining: f64,
    pub iob: f64,
    pub pump_mode: PumpMode,
    pub basal_rate: f64,
    pub active_bolus: Option<ActiveBolus>,
    /// 0 = OK, 1 = suspended, 2 = emergency.
    pub status_code: u8,
    pub active_alerts: Vec<AlertKind>,
    pub bolus_status: String,
    /// Minutes until a pending extended remainder is delivered.
    pub extended_countdown: Option<u32>,
    pub metrics: RuntimeMetrics,
}
