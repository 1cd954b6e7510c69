//! Fault lines, safety alerts and emergency stop.

use super::mock_env::{MockFaults, RecordingSink, quiet_config, running_device};

use insulinpump::alerts::AlertKind;
use insulinpump::app::commands::{CommandOutcome, DeviceCommand};
use insulinpump::app::events::{DeviceEvent, LogKind};
use insulinpump::config::SystemConfig;
use insulinpump::drivers::pump::{BlockReason, BolusOutcome, PumpMode};
use insulinpump::invariants;
use insulinpump::sensors::GlucoseSample;

fn start_bolus(dev: &mut insulinpump::app::service::Device, sink: &mut RecordingSink) {
    let f = MockFaults::healthy();
    dev.handle_command(
        DeviceCommand::CalculateDose {
            glucose: 8.0,
            carbs: 0.0,
        },
        &f,
        sink,
    )
    .unwrap();
    dev.handle_command(DeviceCommand::ConfirmDeliver, &f, sink)
        .unwrap();
}

#[test]
fn occlusion_halts_all_delivery_until_cleared() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let healthy = MockFaults::healthy();
    let occluded = MockFaults {
        pump_error: true,
        ..healthy
    };

    dev.tick(&healthy, &mut sink).unwrap();
    start_bolus(&mut dev, &mut sink);
    let before = *dev.metrics();

    let snap = dev.tick(&occluded, &mut sink).unwrap();
    assert_eq!(snap.pump_mode, PumpMode::Emergency);
    assert_eq!(snap.status_code, 2);
    assert!(snap.active_alerts.contains(&AlertKind::PumpOcclusion));
    assert_eq!(snap.metrics.bolus_delivered, before.bolus_delivered);
    assert_eq!(snap.metrics.basal_delivered, before.basal_delivered);
    assert!(sink.has_log(LogKind::Warning, "Emergency stop activated"));
    assert_eq!(invariants::check(&snap), Ok(()));

    // New boluses are refused while the line is held
    let out = dev
        .handle_command(DeviceCommand::ConfirmDeliver, &occluded, &mut sink)
        .unwrap();
    assert_eq!(out, CommandOutcome::Bolus(BolusOutcome::Blocked(BlockReason::Emergency)));
    assert!(sink.has_log(LogKind::Error, "Bolus blocked due to unsafe condition"));

    // The held bolus resumes once the fault clears
    let snap = dev.tick(&healthy, &mut sink).unwrap();
    assert_eq!(snap.pump_mode, PumpMode::Delivering);
    assert!(!snap.active_alerts.contains(&AlertKind::PumpOcclusion));
    assert!(snap.metrics.bolus_delivered > before.bolus_delivered);
    assert!(sink.events.contains(&DeviceEvent::AlertCleared(AlertKind::PumpOcclusion)));
}

#[test]
fn cgm_disconnect_skips_control_but_keeps_basal() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let healthy = MockFaults::healthy();
    let lost = MockFaults {
        cgm_up: false,
        ..healthy
    };

    let first = dev.tick(&healthy, &mut sink).unwrap();
    sink.clear();

    let snap = dev.tick(&lost, &mut sink).unwrap();
    assert_eq!(snap.glucose, GlucoseSample::Disconnected);
    assert!(snap.active_alerts.contains(&AlertKind::CgmDisconnected));
    assert_eq!(snap.pump_mode, PumpMode::Suspended, "bolus suspended without a reading");
    assert_eq!(snap.basal_rate, first.basal_rate);
    assert!(snap.metrics.basal_delivered > first.metrics.basal_delivered);
    assert_eq!(
        sink.count(|e| matches!(e, DeviceEvent::Glucose { .. })),
        0,
        "no reading is recorded while disconnected"
    );
    assert_eq!(invariants::check(&snap), Ok(()));

    let snap = dev.tick(&healthy, &mut sink).unwrap();
    assert!(!snap.active_alerts.contains(&AlertKind::CgmDisconnected));
    assert!(snap.glucose.value().is_some());
}

#[test]
fn carb_intake_raises_high_glucose_alert() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    dev.handle_command(DeviceCommand::CarbIntake { grams: 40.0 }, &f, &mut sink)
        .unwrap();
    let snap = dev.tick(&f, &mut sink).unwrap();

    // 6.0 start + 40 g * 0.09 + one tick of rise (2.0 / 12)
    let g = snap.glucose.value().unwrap();
    assert!((g - (6.0 + 3.6 + 2.0 / 12.0)).abs() < 1e-9);
    assert!(snap.active_alerts.contains(&AlertKind::GlucoseHigh));
    assert!(sink.has_log(LogKind::Warning, "above maximum safe level"));
}

#[test]
fn negative_carbs_rejected() {
    let (mut dev, mut sink) = running_device(quiet_config());
    assert!(dev
        .handle_command(
            DeviceCommand::CarbIntake { grams: -5.0 },
            &MockFaults::healthy(),
            &mut sink
        )
        .is_err());
}

#[test]
fn low_cartridge_alert_cleared_by_refill() {
    let config = SystemConfig {
        reservoir_capacity_units: 1.0,
        reservoir_low_units: 0.95,
        ..quiet_config()
    };
    let (mut dev, mut sink) = running_device(config);
    let f = MockFaults::healthy();

    // One tick of basal at 0.8 U/h takes the cartridge under the threshold
    dev.tick(&f, &mut sink).unwrap();
    let snap = dev.tick(&f, &mut sink).unwrap();
    assert!(snap.active_alerts.contains(&AlertKind::InsulinLow));

    dev.handle_command(DeviceCommand::RefillInsulin, &f, &mut sink)
        .unwrap();
    assert_eq!(dev.reserve().remaining(), 1.0);
    assert!(!dev.safety().is_active(AlertKind::InsulinLow));
    assert!(sink.events.contains(&DeviceEvent::AlertCleared(AlertKind::InsulinLow)));
}

#[test]
fn each_alert_is_raised_once_while_active() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let lost = MockFaults {
        cgm_up: false,
        pump_error: false,
    };
    for _ in 0..5 {
        dev.tick(&lost, &mut sink).unwrap();
    }
    assert_eq!(
        sink.count(|e| *e == DeviceEvent::AlertRaised(AlertKind::CgmDisconnected)),
        1
    );
    assert_eq!(dev.metrics().alerts_raised, 1);
}
