//! Bolus workflow: calculate → override → confirm / extend / cancel.

use super::mock_env::{MockFaults, RecordingSink, quiet_config, running_device};

use insulinpump::app::commands::{CommandOutcome, DeviceCommand};
use insulinpump::app::events::{DeviceEvent, LogKind};
use insulinpump::app::service::Device;
use insulinpump::config::SystemConfig;
use insulinpump::drivers::pump::{BlockReason, BolusOutcome, PumpMode};
use insulinpump::error::{CommandError, Error, ValidationError};
use insulinpump::profile::Profile;

const EPS: f64 = 1e-9;

fn calculate(dev: &mut Device, sink: &mut RecordingSink, glucose: f64, carbs: f64) -> f64 {
    match dev
        .handle_command(
            DeviceCommand::CalculateDose { glucose, carbs },
            &MockFaults::healthy(),
            sink,
        )
        .unwrap()
    {
        CommandOutcome::Dose(d) => d,
        other => panic!("expected a dose, got {other:?}"),
    }
}

#[test]
fn calculator_needs_an_unlocked_device() {
    let mut dev = Device::new(quiet_config()).unwrap();
    let mut sink = RecordingSink::new();
    let f = MockFaults::healthy();
    dev.handle_command(DeviceCommand::PowerOn, &f, &mut sink).unwrap();

    let res = dev.handle_command(
        DeviceCommand::CalculateDose {
            glucose: 8.0,
            carbs: 0.0,
        },
        &f,
        &mut sink,
    );
    assert_eq!(res, Err(Error::Command(CommandError::DeviceLocked)));
}

#[test]
fn confirm_without_calculation_is_rejected() {
    let (mut dev, mut sink) = running_device(quiet_config());
    assert_eq!(
        dev.handle_command(DeviceCommand::ConfirmDeliver, &MockFaults::healthy(), &mut sink),
        Err(Error::Command(CommandError::NoRecommendation))
    );
}

#[test]
fn calculated_bolus_is_throttled_by_bolus_rate() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    // (8.0 - 5.5) / 2.5 = 1.0 U correction, no carbs
    assert!((calculate(&mut dev, &mut sink, 8.0, 0.0) - 1.0).abs() < EPS);
    let out = dev
        .handle_command(DeviceCommand::ConfirmDeliver, &f, &mut sink)
        .unwrap();
    assert_eq!(
        out,
        CommandOutcome::Bolus(BolusOutcome::Started {
            requested: 1.0,
            accepted: 1.0
        })
    );
    assert_eq!(dev.pump().mode(), PumpMode::Delivering);
    assert!(sink.has_log(LogKind::Manual, "confirmed"));

    // 10 U/h over a 5 minute tick
    let snap = dev.tick(&f, &mut sink).unwrap();
    assert!((snap.metrics.bolus_delivered - 10.0 / 12.0).abs() < EPS);
    assert!(snap.active_bolus.is_some());

    let snap = dev.tick(&f, &mut sink).unwrap();
    assert!((snap.metrics.bolus_delivered - 1.0).abs() < EPS);
    assert!(snap.active_bolus.is_none());
    assert_eq!(snap.pump_mode, PumpMode::Idle);
}

#[test]
fn override_replaces_recommendation_until_recalculated() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    calculate(&mut dev, &mut sink, 8.0, 40.0);
    assert_eq!(
        dev.handle_command(DeviceCommand::OverrideDose(30.0), &f, &mut sink),
        Err(Error::Validation(ValidationError::OverrideOutOfRange))
    );
    assert_eq!(
        dev.handle_command(DeviceCommand::OverrideDose(3.0), &f, &mut sink),
        Ok(CommandOutcome::Dose(3.0))
    );
    assert!(dev.calculator().is_overridden());

    calculate(&mut dev, &mut sink, 8.0, 0.0);
    assert!(!dev.calculator().is_overridden());
}

#[test]
fn cartridge_caps_the_bolus() {
    let config = SystemConfig {
        reservoir_capacity_units: 2.0,
        reservoir_low_units: 0.5,
        ..quiet_config()
    };
    let (mut dev, mut sink) = running_device(config);
    let f = MockFaults::healthy();

    calculate(&mut dev, &mut sink, 8.0, 0.0);
    dev.handle_command(DeviceCommand::OverrideDose(5.0), &f, &mut sink)
        .unwrap();
    let out = dev
        .handle_command(DeviceCommand::ConfirmDeliver, &f, &mut sink)
        .unwrap();
    assert_eq!(
        out,
        CommandOutcome::Bolus(BolusOutcome::Started {
            requested: 5.0,
            accepted: 2.0
        })
    );

    let mut last = None;
    for _ in 0..6 {
        last = dev.tick(&f, &mut sink);
    }
    let snap = last.unwrap();
    assert_eq!(snap.insulin_remaining, 0.0);
    assert!((snap.metrics.total_delivered() - 2.0).abs() < 1e-6);
    assert!(snap.metrics.shortfall() > 0.0, "basal keeps asking once empty");
    assert!(snap.active_alerts.contains(&insulinpump::alerts::AlertKind::InsulinLow));
}

#[test]
fn low_glucose_suspends_and_blocks_manual_bolus() {
    let config = SystemConfig {
        cgm_start_glucose: 3.5,
        cgm_rise_per_hour: 0.0,
        ..quiet_config()
    };
    let (mut dev, mut sink) = running_device(config);
    let f = MockFaults::healthy();

    let snap = dev.tick(&f, &mut sink).unwrap();
    assert_eq!(snap.glucose.value(), Some(3.5));
    assert_eq!(snap.basal_rate, 0.0);
    assert_eq!(snap.pump_mode, PumpMode::Suspended);
    assert_eq!(snap.status_code, 1);

    calculate(&mut dev, &mut sink, 3.5, 40.0);
    let out = dev
        .handle_command(DeviceCommand::ConfirmDeliver, &f, &mut sink)
        .unwrap();
    assert_eq!(out, CommandOutcome::Bolus(BolusOutcome::Blocked(BlockReason::LowGlucose)));
    assert!(sink.has_log(LogKind::Warning, "Bolus disabled"));
    assert_eq!(dev.metrics().blocked_requests, 1);
    assert!(dev.pump().active_bolus().is_none());
}

#[test]
fn zero_dose_is_not_delivered() {
    let (mut dev, mut sink) = running_device(quiet_config());
    calculate(&mut dev, &mut sink, 5.0, 0.0);
    let out = dev
        .handle_command(DeviceCommand::ConfirmDeliver, &MockFaults::healthy(), &mut sink)
        .unwrap();
    assert_eq!(
        out,
        CommandOutcome::Bolus(BolusOutcome::Blocked(BlockReason::InvalidRequest))
    );
}

#[test]
fn extended_bolus_delivers_remainder_at_expiry() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    // 1.0 U correction + 40 g * 0.09 / 2.5 = 1.44 U carbs
    let total = calculate(&mut dev, &mut sink, 8.0, 40.0);
    assert!((total - 2.44).abs() < EPS);

    let out = dev
        .handle_command(
            DeviceCommand::StartExtendedBolus {
                percent_now: 50.0,
                delay_minutes: 12,
            },
            &f,
            &mut sink,
        )
        .unwrap();
    let CommandOutcome::Extended { now, later, outcome } = out else {
        panic!("expected extended outcome, got {out:?}");
    };
    assert!((now - 1.22).abs() < EPS);
    assert!((later - 1.22).abs() < EPS);
    assert!(matches!(outcome, BolusOutcome::Started { .. }));
    assert!(sink.has_log(LogKind::ExtendedBolus, "in 12 min"));

    let snap = dev.tick(&f, &mut sink).unwrap();
    assert_eq!(snap.extended_countdown, Some(7));
    let snap = dev.tick(&f, &mut sink).unwrap();
    assert_eq!(snap.extended_countdown, Some(2));
    let snap = dev.tick(&f, &mut sink).unwrap();
    assert_eq!(snap.extended_countdown, None);

    assert!((snap.metrics.bolus_delivered - total).abs() < 1e-6);
    assert!(sink.has_log(LogKind::ExtendedBolus, "Delivered extended dose"));
    assert!(sink
        .events
        .contains(&DeviceEvent::ExtendedCountdown { minutes_remaining: 0 }));
}

#[test]
fn extended_bolus_parameters_validated() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();
    calculate(&mut dev, &mut sink, 8.0, 0.0);

    let start = |pct: f64, delay: u32| DeviceCommand::StartExtendedBolus {
        percent_now: pct,
        delay_minutes: delay,
    };
    assert_eq!(
        dev.handle_command(start(150.0, 30), &f, &mut sink),
        Err(Error::Validation(ValidationError::ExtendedPercentOutOfRange))
    );
    assert_eq!(
        dev.handle_command(start(50.0, 0), &f, &mut sink),
        Err(Error::Validation(ValidationError::ExtendedDelayOutOfRange))
    );
    assert_eq!(
        dev.handle_command(start(50.0, 241), &f, &mut sink),
        Err(Error::Validation(ValidationError::ExtendedDelayOutOfRange))
    );
    assert!(dev.pump().schedule().is_none());
}

#[test]
fn cancel_reports_in_flight_and_scheduled_units() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    calculate(&mut dev, &mut sink, 8.0, 40.0);
    dev.handle_command(
        DeviceCommand::StartExtendedBolus {
            percent_now: 50.0,
            delay_minutes: 60,
        },
        &f,
        &mut sink,
    )
    .unwrap();

    let out = dev
        .handle_command(DeviceCommand::CancelBolus, &f, &mut sink)
        .unwrap();
    let CommandOutcome::Cancelled { undelivered } = out else {
        panic!("expected cancellation, got {out:?}");
    };
    assert!((undelivered - 2.44).abs() < EPS);
    assert!(sink.has_log(LogKind::Manual, "cancelled by user"));
    assert_eq!(
        sink.count(|e| matches!(e, DeviceEvent::BolusCancelled { .. })),
        1
    );
    assert_eq!(dev.pump().mode(), PumpMode::Suspended);

    // Only basal flows after a cancel
    let snap = dev.tick(&f, &mut sink).unwrap();
    assert_eq!(snap.metrics.bolus_delivered, 0.0);
    assert!(snap.metrics.basal_delivered > 0.0);

    // A new confirmation lifts the suspension
    dev.handle_command(DeviceCommand::ConfirmDeliver, &f, &mut sink)
        .unwrap();
    assert!(sink.has_log(LogKind::Info, "Bolus delivery resumed"));
    assert_eq!(dev.pump().mode(), PumpMode::Delivering);
}

#[test]
fn cancel_with_nothing_in_flight_reports_no_units() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let out = dev
        .handle_command(DeviceCommand::CancelBolus, &MockFaults::healthy(), &mut sink)
        .unwrap();
    assert_eq!(out, CommandOutcome::Cancelled { undelivered: 0.0 });
    assert_eq!(
        sink.count(|e| matches!(e, DeviceEvent::BolusCancelled { .. })),
        0
    );
    assert_eq!(
        sink.count(|e| *e == DeviceEvent::ExtendedCountdown { minutes_remaining: 0 }),
        1,
        "countdown display is reset on every cancel"
    );
}

#[test]
fn profile_switch_changes_dose_math() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    let bad = Profile {
        correction_factor: 0.0,
        ..Profile::default()
    };
    assert!(dev
        .handle_command(DeviceCommand::SwitchProfile(bad), &f, &mut sink)
        .is_err());

    let sport = Profile {
        name: "Sport".to_owned(),
        correction_factor: 5.0,
        ..Profile::default()
    };
    dev.handle_command(DeviceCommand::SwitchProfile(sport), &f, &mut sink)
        .unwrap();
    assert_eq!(dev.profile().name, "Sport");
    // (8.0 - 5.5) / 5.0
    assert!((calculate(&mut dev, &mut sink, 8.0, 0.0) - 0.5).abs() < EPS);
}
