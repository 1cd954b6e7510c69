//! Mock adapters for integration tests.
//!
//! Records every emitted event so tests can assert on the full history
//! without a real console or log backend.

use insulinpump::app::commands::DeviceCommand;
use insulinpump::app::events::{DeviceEvent, LogKind};
use insulinpump::app::ports::{EventSink, FaultSignals};
use insulinpump::app::service::Device;
use insulinpump::config::SystemConfig;

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<DeviceEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// True if any history entry of `kind` contains `text`.
    pub fn has_log(&self, kind: LogKind, text: &str) -> bool {
        self.events.iter().any(|e| match e {
            DeviceEvent::Log { kind: k, message } => *k == kind && message.contains(text),
            _ => false,
        })
    }

    pub fn count(&self, pred: impl Fn(&DeviceEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &DeviceEvent) {
        self.events.push(event.clone());
    }
}

// ── MockFaults ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct MockFaults {
    pub cgm_up: bool,
    pub pump_error: bool,
}

impl MockFaults {
    pub fn healthy() -> Self {
        Self {
            cgm_up: true,
            pump_error: false,
        }
    }
}

impl FaultSignals for MockFaults {
    fn cgm_link_up(&self) -> bool {
        self.cgm_up
    }

    fn pump_error(&self) -> bool {
        self.pump_error
    }
}

// ── Device fixtures ───────────────────────────────────────────

/// Defaults with CGM noise switched off.
pub fn quiet_config() -> SystemConfig {
    SystemConfig {
        cgm_volatility: 0.0,
        rng_seed: Some(42),
        ..SystemConfig::default()
    }
}

/// Power on and unlock without running the unlock-time cycle, so the
/// first `tick` in a test is the first closed-loop cycle.
pub fn running_device(config: SystemConfig) -> (Device, RecordingSink) {
    let mut dev = Device::new(config).expect("valid config");
    let mut sink = RecordingSink::new();
    let faults = MockFaults::healthy();
    for cmd in [
        DeviceCommand::Pause,
        DeviceCommand::PowerOn,
        DeviceCommand::Unlock,
        DeviceCommand::Resume,
    ] {
        dev.handle_command(cmd, &faults, &mut sink).expect("start-up command");
    }
    sink.clear();
    (dev, sink)
}
