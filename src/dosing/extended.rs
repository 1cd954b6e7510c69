//! Pending remainder of an extended bolus.
//!
//! The schedule counts down in simulated minutes.  When it expires the
//! whole remainder is handed to the pump in one shot; it is not throttled
//! by the bolus rate.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtendedBolusSchedule {
    remaining_amount: f64,
    minutes_remaining: u32,
}

/// Result of advancing the countdown by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleStep {
    Pending { minutes_remaining: u32 },
    Due { units: f64 },
}

impl ExtendedBolusSchedule {
    pub fn new(remaining_amount: f64, delay_minutes: u32) -> Self {
        Self {
            remaining_amount,
            minutes_remaining: delay_minutes,
        }
    }

    pub fn remaining_amount(&self) -> f64 {
        self.remaining_amount
    }

    pub fn minutes_remaining(&self) -> u32 {
        self.minutes_remaining
    }

    /// Count down one tick.  Once `Due` is returned the schedule is spent
    /// and the caller drops it.
    pub fn advance(&mut self, tick_minutes: u32) -> ScheduleStep {
        self.minutes_remaining = self.minutes_remaining.saturating_sub(tick_minutes);
        if self.minutes_remaining == 0 {
            ScheduleStep::Due {
                units: self.remaining_amount,
            }
        } else {
            ScheduleStep::Pending {
                minutes_remaining: self.minutes_remaining,
            }
        }
    }
}
