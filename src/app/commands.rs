//! Inbound commands to the device service.
//!
//! These represent actions requested by the outside world (console, UI,
//! test harness) that the [`Device`](super::service::Device) interprets.
//! Commands are applied immediately between ticks through
//! `Device::handle_command`, or parked in the [`CommandQueue`] and
//! drained at the start of the next tick.

use heapless::Deque;

use crate::drivers::pump::BolusOutcome;
use crate::error::{QueueError, Result};
use crate::profile::Profile;

/// Commands that external adapters can send into the device core.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    PowerOn,
    PowerOff,
    Unlock,

    /// Ticks per real second.
    SetSimRate(u32),
    Pause,
    Resume,

    /// Carbohydrates eaten (grams).
    CarbIntake { grams: f64 },

    /// Fresh dose calculation; clears any override.
    CalculateDose { glucose: f64, carbs: f64 },
    OverrideDose(f64),
    ConfirmDeliver,
    StartExtendedBolus { percent_now: f64, delay_minutes: u32 },
    CancelBolus,

    SwitchProfile(Profile),
    ChargeBattery,
    RefillInsulin,
}

/// What a successfully handled command produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    Applied,
    /// Dose from `CalculateDose` or `OverrideDose` (U).
    Dose(f64),
    Bolus(BolusOutcome),
    Extended { now: f64, later: f64, outcome: BolusOutcome },
    /// Units that will no longer be delivered.
    Cancelled { undelivered: f64 },
}

/// Maximum number of commands parked between ticks.
pub const COMMAND_QUEUE_CAP: usize = 16;

/// Bounded FIFO of commands deferred to the next tick boundary.
#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: Deque<DeviceCommand, COMMAND_QUEUE_CAP>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: DeviceCommand) -> Result<()> {
        self.inner
            .push_back(cmd)
            .map_err(|_| QueueError::Full.into())
    }

    pub fn pop(&mut self) -> Option<DeviceCommand> {
        self.inner.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
