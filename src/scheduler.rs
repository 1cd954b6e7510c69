//! Simulation clock.
//!
//! Drives the cooperative tick loop.  The clock only keeps time and
//! cadence; the runtime asks it for [`interval`](SimulationClock::interval)
//! and calls `Device::tick` when that much real time has passed.
//!
//! ```text
//!   real time ──[interval = 1000 ms / rate]──▶ Device::tick()
//!                                                 │
//!   simulated time ◀──────[+tick_minutes]─────────┘
//! ```
//!
//! Pausing halts scheduling only; no device state is touched.

use core::fmt;
use std::time::{Duration, Instant};

use log::info;
use serde::Serialize;

use crate::config::SystemConfig;
use crate::error::{Result, ValidationError};

// ═══════════════════════════════════════════════════════════════
//  Simulated time
// ═══════════════════════════════════════════════════════════════

/// Minutes since the simulation started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SimTime(pub u64);

impl SimTime {
    pub fn minutes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = self.0 / (24 * 60);
        let hour = (self.0 / 60) % 24;
        let minute = self.0 % 60;
        write!(f, "d{day} {hour:02}:{minute:02}")
    }
}

// ═══════════════════════════════════════════════════════════════
//  Clock
// ═══════════════════════════════════════════════════════════════

pub struct SimulationClock {
    now: SimTime,
    tick_minutes: u32,
    /// Ticks per real second.
    rate: u32,
    max_rate: u32,
    paused: bool,
}

impl SimulationClock {
    pub fn new(tick_minutes: u32, rate: u32, max_rate: u32) -> Self {
        Self {
            now: SimTime::default(),
            tick_minutes,
            rate: rate.clamp(1, max_rate.max(1)),
            max_rate: max_rate.max(1),
            paused: false,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.tick_minutes, config.sim_rate, config.max_sim_rate)
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn tick_minutes(&self) -> u32 {
        self.tick_minutes
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Change the cadence.  Rejected outside `1..=max_rate`.
    pub fn set_rate(&mut self, rate: u32) -> Result<()> {
        if !(1..=self.max_rate).contains(&rate) {
            return Err(ValidationError::SimRateOutOfRange.into());
        }
        if rate != self.rate {
            info!("CLOCK: sim rate {} -> {}", self.rate, rate);
        }
        self.rate = rate;
        Ok(())
    }

    pub fn pause(&mut self) {
        if !self.paused {
            info!("CLOCK: paused at {}", self.now);
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            info!("CLOCK: resumed at {}", self.now);
        }
        self.paused = false;
    }

    /// Real time between two ticks.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.rate))
    }

    /// Move simulated time forward by one tick.
    pub fn advance(&mut self) -> SimTime {
        self.now = SimTime(self.now.0 + u64::from(self.tick_minutes));
        self.now
    }
}

// ═══════════════════════════════════════════════════════════════
//  Real-time deadline
// ═══════════════════════════════════════════════════════════════

/// Wall-clock instant of the next tick.  Input handled between ticks
/// does not push the deadline back.
#[derive(Debug, Clone, Copy)]
pub struct TickDeadline {
    due: Instant,
}

impl TickDeadline {
    pub fn after(now: Instant, interval: Duration) -> Self {
        Self { due: now + interval }
    }

    /// Time left before the tick is due; zero once it is.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.due.saturating_duration_since(now)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.due
    }

    /// Schedule the following tick one interval from `now`.
    pub fn rearm(&mut self, now: Instant, interval: Duration) {
        self.due = now + interval;
    }
}
