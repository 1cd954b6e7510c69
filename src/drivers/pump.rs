//! Insulin pump delivery controller.
//!
//! Executes basal and bolus delivery each tick against the cartridge and
//! the bloodstream, subject to suspend/resume and emergency stop.
//!
//! ```text
//!            deliver_bolus                 amount exhausted
//!   IDLE ───────────────────▶ DELIVERING ───────────────────▶ IDLE
//!     ▲                           │
//!     │ resume_bolus              │ suspend_bolus (zeroes bolus)
//!     │                           ▼
//!     └────────────────────── SUSPENDED
//!
//!   any ──[pump error signal]──▶ EMERGENCY   (re-derived every tick)
//! ```
//!
//! ## Safety contract
//!
//! - Emergency delivers nothing, whatever the other flags say.
//! - Suspended refuses new boluses; basal keeps running.
//! - Only units actually released by the cartridge reach the bloodstream.
//! - A blocked request is logged, never raised as an error.

use log::{error, info, warn};
use serde::Serialize;

use crate::app::events::{DeviceEvent, LogKind};
use crate::app::ports::EventSink;
use crate::bloodstream::Bloodstream;
use crate::dosing::{ExtendedBolusSchedule, ScheduleStep};
use crate::drivers::reservoir::InsulinReserve;

/// Bolus currently being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveBolus {
    /// Units still to deliver.
    pub amount: f64,
    /// Delivery rate (U/h).
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PumpMode {
    Idle,
    Delivering,
    Suspended,
    Emergency,
}

/// Why a delivery request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockReason {
    Suspended,
    Emergency,
    LowGlucose,
    /// Zero, negative or non-finite dose or rate.
    InvalidRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BolusOutcome {
    /// `accepted` may be below `requested` when the cartridge is short.
    Started { requested: f64, accepted: f64 },
    Blocked(BlockReason),
}

/// Units requested and released during one pump tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PumpTick {
    pub bolus_requested: f64,
    pub bolus_delivered: f64,
    pub basal_requested: f64,
    pub basal_delivered: f64,
}

impl PumpTick {
    pub fn delivered(&self) -> f64 {
        self.bolus_delivered + self.basal_delivered
    }
}

pub struct PumpController {
    basal_rate: f64,
    active_bolus: Option<ActiveBolus>,
    suspended: bool,
    emergency_stopped: bool,
    schedule: Option<ExtendedBolusSchedule>,
    tick_minutes: u32,
    ticks_per_hour: f64,
}

impl PumpController {
    pub fn new(tick_minutes: u32) -> Self {
        Self {
            basal_rate: 0.0,
            active_bolus: None,
            suspended: false,
            emergency_stopped: false,
            schedule: None,
            tick_minutes,
            ticks_per_hour: 60.0 / f64::from(tick_minutes.max(1)),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> PumpMode {
        if self.emergency_stopped {
            PumpMode::Emergency
        } else if self.suspended {
            PumpMode::Suspended
        } else if self.active_bolus.is_some() {
            PumpMode::Delivering
        } else {
            PumpMode::Idle
        }
    }

    /// 0 = OK, 1 = suspended, 2 = emergency.
    pub fn status_code(&self) -> u8 {
        if self.emergency_stopped {
            2
        } else if self.suspended {
            1
        } else {
            0
        }
    }

    pub fn basal_rate(&self) -> f64 {
        self.basal_rate
    }

    pub fn active_bolus(&self) -> Option<ActiveBolus> {
        self.active_bolus
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stopped
    }

    pub fn schedule(&self) -> Option<&ExtendedBolusSchedule> {
        self.schedule.as_ref()
    }

    /// One-line status for the bolus screen.
    pub fn bolus_status(&self) -> String {
        match (self.mode(), self.active_bolus, &self.schedule) {
            (PumpMode::Emergency, ..) => "Emergency stop: delivery halted".to_owned(),
            (PumpMode::Suspended, ..) => "Bolus suspended".to_owned(),
            (_, Some(b), _) => format!("Delivering: {:.2} U remaining", b.amount),
            (_, None, Some(s)) => format!(
                "Extended: {:.2} U in {} min",
                s.remaining_amount(),
                s.minutes_remaining()
            ),
            _ => "No active bolus".to_owned(),
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Start a bolus of up to `amount` units at `rate` U/h.  The accepted
    /// amount is capped by what the cartridge holds right now.
    pub fn deliver_bolus(
        &mut self,
        amount: f64,
        rate: f64,
        reserve: &InsulinReserve,
        sink: &mut impl EventSink,
    ) -> BolusOutcome {
        if let Some(reason) = self.block_reason() {
            warn!("PUMP: bolus of {:.2} U blocked ({:?})", amount, reason);
            sink.emit(&DeviceEvent::log(
                LogKind::Error,
                "Bolus blocked due to unsafe condition.",
            ));
            return BolusOutcome::Blocked(reason);
        }
        if !amount.is_finite() || amount <= 0.0 || !rate.is_finite() || rate <= 0.0 {
            return BolusOutcome::Blocked(BlockReason::InvalidRequest);
        }

        let accepted = amount.min(reserve.remaining());
        self.active_bolus = Some(ActiveBolus {
            amount: accepted,
            rate,
        });
        info!("PUMP: bolus {:.2} U at {:.1} U/h", accepted, rate);
        sink.emit(&DeviceEvent::log(
            LogKind::Info,
            format!("Delivered {accepted:.2} units at rate {rate}"),
        ));
        BolusOutcome::Started {
            requested: amount,
            accepted,
        }
    }

    /// Deliver `now` immediately at `rate` and hold `later` until
    /// `delay_minutes` have elapsed.
    pub fn start_extended_bolus(
        &mut self,
        now: f64,
        later: f64,
        delay_minutes: u32,
        rate: f64,
        reserve: &InsulinReserve,
        sink: &mut impl EventSink,
    ) -> BolusOutcome {
        let outcome = if now > 0.0 {
            self.deliver_bolus(now, rate, reserve, sink)
        } else if let Some(reason) = self.block_reason() {
            BolusOutcome::Blocked(reason)
        } else {
            BolusOutcome::Started {
                requested: 0.0,
                accepted: 0.0,
            }
        };

        if matches!(outcome, BolusOutcome::Started { .. }) && later > 0.0 {
            self.schedule = Some(ExtendedBolusSchedule::new(later, delay_minutes));
            sink.emit(&DeviceEvent::ExtendedCountdown {
                minutes_remaining: delay_minutes,
            });
        }
        outcome
    }

    /// Takes effect on the next tick.
    pub fn adjust_basal_rate(&mut self, rate: f64) {
        self.basal_rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
    }

    /// Stop any bolus in flight and refuse new ones until resumed.
    /// Returns the units that will no longer be delivered.
    pub fn suspend_bolus(&mut self, sink: &mut impl EventSink) -> f64 {
        self.suspended = true;
        let in_flight = self.active_bolus.take().map_or(0.0, |b| b.amount);
        let scheduled = self.schedule.take();
        let undelivered = in_flight + scheduled.map_or(0.0, |s| s.remaining_amount());

        if in_flight > 0.0 || scheduled.is_some() {
            warn!("PUMP: bolus cancelled, {:.2} U undelivered", undelivered);
            sink.emit(&DeviceEvent::BolusCancelled { undelivered });
            sink.emit(&DeviceEvent::log(
                LogKind::Warning,
                format!("Bolus cancelled with {undelivered:.2} units remaining to deliver"),
            ));
        }
        if scheduled.is_some() {
            sink.emit(&DeviceEvent::ExtendedCountdown {
                minutes_remaining: 0,
            });
        }
        undelivered
    }

    /// Lift a suspension.  Has no effect during an emergency stop.
    pub fn resume_bolus(&mut self, sink: &mut impl EventSink) -> bool {
        if self.emergency_stopped {
            return false;
        }
        if self.suspended {
            self.suspended = false;
            info!("PUMP: bolus delivery resumed");
            sink.emit(&DeviceEvent::log(LogKind::Info, "Bolus delivery resumed."));
        }
        true
    }

    /// Halt all delivery.  The next tick re-derives the flag from the
    /// pump error signal.
    pub fn trigger_emergency_stop(&mut self, sink: &mut impl EventSink) {
        if !self.emergency_stopped {
            error!("PUMP: emergency stop");
            sink.emit(&DeviceEvent::log(LogKind::Warning, "Emergency stop activated."));
        }
        self.emergency_stopped = true;
    }

    /// Device power-off: a pending extended remainder does not survive.
    pub fn power_down(&mut self) {
        if self.schedule.take().is_some() {
            info!("PUMP: pending extended bolus discarded on power-off");
        }
    }

    // ── Per-tick delivery ─────────────────────────────────────

    /// Deliver one tick's worth of insulin.
    pub fn tick(
        &mut self,
        bloodstream: &mut Bloodstream,
        reserve: &mut InsulinReserve,
        pump_error: bool,
        sink: &mut impl EventSink,
    ) -> PumpTick {
        if pump_error && !self.emergency_stopped {
            self.trigger_emergency_stop(sink);
        } else if !pump_error && self.emergency_stopped {
            info!("PUMP: error signal cleared, emergency stop released");
        }
        self.emergency_stopped = pump_error;

        let mut out = PumpTick::default();
        if self.emergency_stopped {
            return out;
        }

        // Extended remainder, one shot at expiry
        if let Some(mut schedule) = self.schedule.take() {
            match schedule.advance(self.tick_minutes) {
                ScheduleStep::Pending { minutes_remaining } => {
                    self.schedule = Some(schedule);
                    sink.emit(&DeviceEvent::ExtendedCountdown { minutes_remaining });
                }
                ScheduleStep::Due { units } => {
                    let delivered = infuse(bloodstream, reserve, units);
                    out.bolus_requested += units;
                    out.bolus_delivered += delivered;
                    info!("PUMP: extended remainder {:.2} U delivered", delivered);
                    sink.emit(&DeviceEvent::log(
                        LogKind::ExtendedBolus,
                        format!("Delivered extended dose of {delivered:.2} units."),
                    ));
                    sink.emit(&DeviceEvent::ExtendedCountdown {
                        minutes_remaining: 0,
                    });
                }
            }
        }

        // Bolus, throttled to rate/ticks_per_hour
        if !self.suspended {
            if let Some(bolus) = self.active_bolus.as_mut() {
                let step = bolus.amount.min(bolus.rate / self.ticks_per_hour);
                bolus.amount -= step;
                let remaining = bolus.amount;
                let delivered = infuse(bloodstream, reserve, step);
                out.bolus_requested += step;
                out.bolus_delivered += delivered;
                sink.emit(&DeviceEvent::BolusProgress { remaining });
                if remaining <= f64::EPSILON {
                    self.active_bolus = None;
                    info!("PUMP: bolus complete");
                }
            }
        }

        // Basal, always
        let basal = self.basal_rate / self.ticks_per_hour;
        out.basal_requested = basal;
        out.basal_delivered = infuse(bloodstream, reserve, basal);
        out
    }

    fn block_reason(&self) -> Option<BlockReason> {
        if self.emergency_stopped {
            Some(BlockReason::Emergency)
        } else if self.suspended {
            Some(BlockReason::Suspended)
        } else {
            None
        }
    }
}

/// Move up to `units` from the cartridge into the bloodstream.
fn infuse(bloodstream: &mut Bloodstream, reserve: &mut InsulinReserve, units: f64) -> f64 {
    let delivered = reserve.withdraw(units);
    if let Err(e) = bloodstream.inject(delivered) {
        error!("PUMP: injection of {delivered} U rejected: {e}");
    }
    delivered
}
