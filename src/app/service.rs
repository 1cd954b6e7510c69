//! Device service — the hexagonal core.
//!
//! [`Device`] owns every model of one simulated pump (battery, cartridge,
//! bloodstream, CGM, calculator, pump controller, control policy, safety
//! monitor) plus the power FSM and the simulation clock.  All I/O flows
//! through port traits injected at call sites, so the whole device is
//! testable with mock adapters.
//!
//! ```text
//!  FaultSignals ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                   │            Device             │
//!  DeviceCommand ──▶│ FSM · Safety · Control · Pump │
//!                   └──────────────────────────────┘
//! ```
//!
//! One tick is atomic: battery drain → CGM sample → safety evaluation →
//! control decision → pump delivery → telemetry.  Commands never run
//! inside a tick; queued ones are drained before it starts.

use log::{info, warn};

use crate::alerts::AlertKind;
use crate::bloodstream::Bloodstream;
use crate::config::SystemConfig;
use crate::control::{ControlAction, ControlAlgorithm};
use crate::diagnostics::RuntimeMetrics;
use crate::dosing::{DoseCalculator, DoseRequest, split_extended};
use crate::drivers::pump::{BlockReason, BolusOutcome, PumpController};
use crate::drivers::reservoir::InsulinReserve;
use crate::error::{CommandError, Result, ValidationError};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::profile::Profile;
use crate::safety::{SafetyInputs, SafetyMonitor, SafetyReport};
use crate::scheduler::SimulationClock;
use crate::sensors::{BatteryModel, GlucoseModel, GlucoseSample};

use super::commands::{CommandOutcome, CommandQueue, DeviceCommand};
use super::events::{DeviceEvent, DeviceSnapshot, LogKind};
use super::ports::{EventSink, FaultSignals, ProfileSource};

// ───────────────────────────────────────────────────────────────
// Device
// ───────────────────────────────────────────────────────────────

pub struct Device {
    config: SystemConfig,
    fsm: Fsm,
    ctx: FsmContext,
    clock: SimulationClock,

    battery: BatteryModel,
    reserve: InsulinReserve,
    bloodstream: Bloodstream,
    cgm: GlucoseModel,

    calculator: DoseCalculator,
    pump: PumpController,
    control: ControlAlgorithm,
    safety: SafetyMonitor,
    profile: Profile,

    queue: CommandQueue,
    metrics: RuntimeMetrics,
    last_sample: GlucoseSample,
}

impl Device {
    /// Build a powered-off device from a validated configuration.
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;

        let battery = BatteryModel::new(config.battery_critical_level);
        let mut ctx = FsmContext::new(battery.level());
        let mut fsm = Fsm::new(build_state_table(), StateId::Off);
        fsm.start(&mut ctx);

        let cgm = GlucoseModel::from_config(&config);
        let last_sample = GlucoseSample::Reading(cgm.reading());

        Ok(Self {
            fsm,
            ctx,
            clock: SimulationClock::from_config(&config),
            battery,
            reserve: InsulinReserve::from_config(&config),
            bloodstream: Bloodstream::new(),
            cgm,
            calculator: DoseCalculator::new(config.max_override_dose),
            pump: PumpController::new(config.tick_minutes),
            control: ControlAlgorithm::new(config.low_glucose_limit),
            safety: SafetyMonitor::new(&config),
            profile: config.profile.clone(),
            queue: CommandQueue::new(),
            metrics: RuntimeMetrics::new(),
            last_sample,
            config,
        })
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Drain deferred commands, then run one closed-loop cycle if the
    /// device is monitoring and the clock is not paused.
    pub fn tick(
        &mut self,
        faults: &impl FaultSignals,
        sink: &mut impl EventSink,
    ) -> Option<DeviceSnapshot> {
        while let Some(cmd) = self.queue.pop() {
            if let Err(e) = self.apply_command(cmd, faults, sink, false) {
                warn!("Deferred command rejected: {e}");
            }
        }
        if !self.is_running() {
            return None;
        }
        self.run_cycle(faults, sink)
    }

    fn run_cycle(
        &mut self,
        faults: &impl FaultSignals,
        sink: &mut impl EventSink,
    ) -> Option<DeviceSnapshot> {
        let now = self.clock.advance();

        // 1. Battery; a flat battery powers the device off mid-tick
        if self.battery.drain(self.config.battery_drain_per_tick) {
            sink.emit(&DeviceEvent::log(
                LogKind::Error,
                "Battery depleted. Device powered off.",
            ));
        }
        let prev = self.fsm.current_state();
        self.ctx.battery_level = self.battery.level();
        self.fsm.tick(&mut self.ctx);
        if self.fsm.current_state() != prev {
            self.after_transition(prev, sink);
            return None;
        }

        // 2. CGM sample
        let link_up = faults.cgm_link_up();
        let pump_error = faults.pump_error();
        let sample = self
            .cgm
            .sample(&mut self.bloodstream, self.profile.correction_factor, link_up);
        self.last_sample = sample;

        // 3. Safety evaluation
        let report = self.safety.evaluate(&SafetyInputs {
            battery_critical: self.battery.is_critical(),
            reserve_low: self.reserve.is_low(),
            glucose: sample,
            cgm_link_up: link_up,
            pump_error,
            target_glucose: self.profile.target_glucose,
        });
        self.publish_alerts(&report, sink);
        if report.force_suspend {
            self.pump.suspend_bolus(sink);
        }

        // 4. Basal control (needs a reading)
        if let Some(glucose) = sample.value() {
            let action = self
                .control
                .decide(glucose, &self.profile, self.pump.basal_rate());
            self.apply_control(action, sink);
        }

        // 5. Delivery
        let delivered = self
            .pump
            .tick(&mut self.bloodstream, &mut self.reserve, pump_error, sink);
        self.metrics.record_tick(&delivered);

        // 6. Telemetry
        if let Some(glucose) = sample.value() {
            sink.emit(&DeviceEvent::Glucose {
                at: now,
                mmol: glucose,
            });
        }
        sink.emit(&DeviceEvent::Insulin {
            at: now,
            units: self.bloodstream.iob(),
        });
        let snapshot = self.snapshot();
        sink.emit(&DeviceEvent::Snapshot(snapshot.clone()));
        Some(snapshot)
    }

    // ── Command handling ──────────────────────────────────────

    /// Defer a command to the start of the next tick.
    pub fn enqueue(&mut self, cmd: DeviceCommand) -> Result<()> {
        self.queue.push(cmd)
    }

    /// Apply a command now.  Must not be called from inside a tick.
    pub fn handle_command(
        &mut self,
        cmd: DeviceCommand,
        faults: &impl FaultSignals,
        sink: &mut impl EventSink,
    ) -> Result<CommandOutcome> {
        self.apply_command(cmd, faults, sink, true)
    }

    /// `cycle_on_unlock` is false for commands drained by `tick`, which
    /// runs the cycle itself.
    fn apply_command(
        &mut self,
        cmd: DeviceCommand,
        faults: &impl FaultSignals,
        sink: &mut impl EventSink,
        cycle_on_unlock: bool,
    ) -> Result<CommandOutcome> {
        match cmd {
            DeviceCommand::PowerOn => {
                if self.fsm.current_state() != StateId::Off {
                    return Ok(CommandOutcome::Applied);
                }
                if self.battery.is_dead() {
                    warn!("Power-on refused: battery depleted");
                    return Err(CommandError::BatteryDepleted.into());
                }
                self.transition(StateId::Locked, sink);
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::PowerOff => {
                self.transition(StateId::Off, sink);
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::Unlock => {
                match self.fsm.current_state() {
                    StateId::Off => return Err(CommandError::DeviceOff.into()),
                    StateId::Monitoring => return Err(CommandError::NotLocked.into()),
                    StateId::Locked => {}
                }
                self.transition(StateId::Monitoring, sink);
                if cycle_on_unlock && !self.clock.is_paused() {
                    self.run_cycle(faults, sink);
                }
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::SetSimRate(rate) => {
                self.clock.set_rate(rate)?;
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::Pause => {
                self.clock.pause();
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::Resume => {
                self.clock.resume();
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::CarbIntake { grams } => {
                if !grams.is_finite() || grams < 0.0 {
                    return Err(ValidationError::InvalidInput("carbs").into());
                }
                self.cgm.intake_glucose(grams * self.profile.carb_ratio);
                info!("Carb intake: {:.0} g", grams);
                sink.emit(&DeviceEvent::log(
                    LogKind::Info,
                    format!("Carbohydrate intake of {grams:.0} g"),
                ));
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::CalculateDose { glucose, carbs } => {
                self.require_unlocked()?;
                let dose = self.calculator.calculate(glucose, carbs, &self.profile)?;
                Ok(CommandOutcome::Dose(dose))
            }
            DeviceCommand::OverrideDose(dose) => {
                self.require_unlocked()?;
                let dose = self.calculator.override_dose(dose)?;
                Ok(CommandOutcome::Dose(dose))
            }
            DeviceCommand::ConfirmDeliver => {
                self.require_unlocked()?;
                let (request, dose) = self.pending_dose()?;
                if let Some(reason) = self.precheck(request, dose, sink) {
                    return Ok(CommandOutcome::Bolus(BolusOutcome::Blocked(reason)));
                }
                self.pump.resume_bolus(sink);
                let outcome = self.pump.deliver_bolus(
                    dose,
                    self.config.bolus_rate_units_per_hour,
                    &self.reserve,
                    sink,
                );
                match outcome {
                    BolusOutcome::Started { accepted, .. } => sink.emit(&DeviceEvent::log(
                        LogKind::Manual,
                        format!("Bolus of {accepted:.2} units confirmed"),
                    )),
                    BolusOutcome::Blocked(_) => self.metrics.record_blocked(),
                }
                Ok(CommandOutcome::Bolus(outcome))
            }
            DeviceCommand::StartExtendedBolus {
                percent_now,
                delay_minutes,
            } => {
                self.require_unlocked()?;
                if !(0.0..=100.0).contains(&percent_now) {
                    return Err(ValidationError::ExtendedPercentOutOfRange.into());
                }
                let delays =
                    self.config.min_extended_delay_minutes..=self.config.max_extended_delay_minutes;
                if !delays.contains(&delay_minutes) {
                    return Err(ValidationError::ExtendedDelayOutOfRange.into());
                }
                let (request, dose) = self.pending_dose()?;
                if let Some(reason) = self.precheck(request, dose, sink) {
                    return Ok(CommandOutcome::Extended {
                        now: 0.0,
                        later: 0.0,
                        outcome: BolusOutcome::Blocked(reason),
                    });
                }

                let (now, later) = split_extended(dose, percent_now);
                self.pump.resume_bolus(sink);
                let outcome = self.pump.start_extended_bolus(
                    now,
                    later,
                    delay_minutes,
                    self.config.bolus_rate_units_per_hour,
                    &self.reserve,
                    sink,
                );
                match outcome {
                    BolusOutcome::Started { .. } => sink.emit(&DeviceEvent::log(
                        LogKind::ExtendedBolus,
                        format!("Now: {now:.2} units, Later: {later:.2} units in {delay_minutes} min"),
                    )),
                    BolusOutcome::Blocked(_) => self.metrics.record_blocked(),
                }
                Ok(CommandOutcome::Extended {
                    now,
                    later,
                    outcome,
                })
            }
            DeviceCommand::CancelBolus => {
                self.require_unlocked()?;
                let had_schedule = self.pump.schedule().is_some();
                let undelivered = self.pump.suspend_bolus(sink);
                if !had_schedule {
                    sink.emit(&DeviceEvent::ExtendedCountdown {
                        minutes_remaining: 0,
                    });
                }
                sink.emit(&DeviceEvent::log(
                    LogKind::Manual,
                    "Bolus delivery has been cancelled by user",
                ));
                Ok(CommandOutcome::Cancelled { undelivered })
            }
            DeviceCommand::SwitchProfile(profile) => {
                profile.validate()?;
                info!("Profile switched to '{}'", profile.name);
                self.profile = profile;
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::ChargeBattery => {
                self.battery.charge();
                self.ctx.battery_level = self.battery.level();
                self.clear_alert(AlertKind::BatteryLow, sink);
                Ok(CommandOutcome::Applied)
            }
            DeviceCommand::RefillInsulin => {
                self.reserve.refill();
                self.clear_alert(AlertKind::InsulinLow, sink);
                Ok(CommandOutcome::Applied)
            }
        }
    }

    /// Pull the active profile from an external profile store.
    pub fn sync_profile(&mut self, source: &impl ProfileSource) -> Result<()> {
        let profile = source.active_profile();
        profile.validate()?;
        self.profile = profile;
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Point-in-time view of the device.
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            time: self.clock.now(),
            power: self.fsm.current_state(),
            glucose: self.last_sample,
            battery_level: self.battery.level(),
            insulin_remaining: self.reserve.remaining(),
            iob: self.bloodstream.iob(),
            pump_mode: self.pump.mode(),
            basal_rate: self.pump.basal_rate(),
            active_bolus: self.pump.active_bolus(),
            status_code: self.pump.status_code(),
            active_alerts: self.safety.registry().active().collect(),
            bolus_status: self.pump.bolus_status(),
            extended_countdown: self.pump.schedule().map(|s| s.minutes_remaining()),
            metrics: self.metrics,
        }
    }

    /// True when the next `tick` will run the closed loop.
    pub fn is_running(&self) -> bool {
        self.ctx.monitoring && !self.clock.is_paused()
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn pump(&self) -> &PumpController {
        &self.pump
    }

    pub fn reserve(&self) -> &InsulinReserve {
        &self.reserve
    }

    pub fn battery(&self) -> &BatteryModel {
        &self.battery
    }

    pub fn bloodstream(&self) -> &Bloodstream {
        &self.bloodstream
    }

    pub fn safety(&self) -> &SafetyMonitor {
        &self.safety
    }

    pub fn calculator(&self) -> &DoseCalculator {
        &self.calculator
    }

    pub fn metrics(&self) -> &RuntimeMetrics {
        &self.metrics
    }

    pub fn last_sample(&self) -> GlucoseSample {
        self.last_sample
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    // ── Internal ──────────────────────────────────────────────

    fn transition(&mut self, to: StateId, sink: &mut impl EventSink) {
        let from = self.fsm.current_state();
        self.fsm.force_transition(to, &mut self.ctx);
        self.after_transition(from, sink);
    }

    fn after_transition(&mut self, from: StateId, sink: &mut impl EventSink) {
        let to = self.fsm.current_state();
        if to == from {
            return;
        }
        if to == StateId::Off {
            self.pump.power_down();
        }
        sink.emit(&DeviceEvent::StateChanged { from, to });
    }

    fn require_unlocked(&self) -> Result<()> {
        match self.fsm.current_state() {
            StateId::Off => Err(CommandError::DeviceOff.into()),
            StateId::Locked => Err(CommandError::DeviceLocked.into()),
            StateId::Monitoring => Ok(()),
        }
    }

    fn pending_dose(&self) -> Result<(DoseRequest, f64)> {
        self.calculator
            .pending_dose(&self.profile)
            .ok_or_else(|| CommandError::NoRecommendation.into())
    }

    /// Refuse a manual delivery on low glucose or an empty dose.
    fn precheck(
        &mut self,
        request: DoseRequest,
        dose: f64,
        sink: &mut impl EventSink,
    ) -> Option<BlockReason> {
        let reason = if request.glucose < self.config.low_glucose_limit {
            BlockReason::LowGlucose
        } else if dose <= 0.0 {
            BlockReason::InvalidRequest
        } else {
            return None;
        };
        warn!("Bolus disabled: {:?} (glucose {:.1}, dose {:.2})", reason, request.glucose, dose);
        sink.emit(&DeviceEvent::log(
            LogKind::Warning,
            match reason {
                BlockReason::LowGlucose => "Bolus disabled: glucose below safe level",
                _ => "Bolus disabled: no insulin to deliver",
            },
        ));
        self.metrics.record_blocked();
        Some(reason)
    }

    fn apply_control(&mut self, action: ControlAction, sink: &mut impl EventSink) {
        let Some(rate) = action.target_rate() else {
            return;
        };
        if rate == self.pump.basal_rate() {
            return;
        }
        self.pump.adjust_basal_rate(rate);
        info!("CONTROL: {:?}", action);
        if let Some(text) = action.describe() {
            let kind = match action {
                ControlAction::SuspendBasal => LogKind::Warning,
                _ => LogKind::Info,
            };
            sink.emit(&DeviceEvent::log(kind, text));
        }
    }

    fn publish_alerts(&mut self, report: &SafetyReport, sink: &mut impl EventSink) {
        let mut raised = 0;
        for kind in report.raised_kinds() {
            raised += 1;
            sink.emit(&DeviceEvent::AlertRaised(kind));
            sink.emit(&DeviceEvent::log(LogKind::Warning, kind.title()));
        }
        for kind in report.cleared_kinds() {
            sink.emit(&DeviceEvent::AlertCleared(kind));
        }
        self.metrics.record_alerts(raised);
    }

    fn clear_alert(&mut self, kind: AlertKind, sink: &mut impl EventSink) {
        if self.safety.reset_alert(kind) {
            sink.emit(&DeviceEvent::AlertCleared(kind));
        }
    }
}
