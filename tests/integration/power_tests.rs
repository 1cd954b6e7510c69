//! Power lifecycle, battery and simulation clock through the device core.

use super::mock_env::{MockFaults, RecordingSink, quiet_config, running_device};

use insulinpump::alerts::AlertKind;
use insulinpump::app::commands::{COMMAND_QUEUE_CAP, DeviceCommand};
use insulinpump::app::events::{DeviceEvent, LogKind};
use insulinpump::app::service::Device;
use insulinpump::config::SystemConfig;
use insulinpump::error::{CommandError, Error, QueueError, ValidationError};
use insulinpump::fsm::StateId;
use insulinpump::scheduler::SimTime;

#[test]
fn off_locked_monitoring_off() {
    let mut dev = Device::new(quiet_config()).unwrap();
    let mut sink = RecordingSink::new();
    let f = MockFaults::healthy();

    assert_eq!(dev.state(), StateId::Off);
    assert_eq!(
        dev.handle_command(DeviceCommand::Unlock, &f, &mut sink),
        Err(Error::Command(CommandError::DeviceOff))
    );

    dev.handle_command(DeviceCommand::PowerOn, &f, &mut sink).unwrap();
    assert_eq!(dev.state(), StateId::Locked);
    assert!(sink.events.contains(&DeviceEvent::StateChanged {
        from: StateId::Off,
        to: StateId::Locked
    }));
    assert!(dev.tick(&f, &mut sink).is_none(), "locked device does not run the loop");

    dev.handle_command(DeviceCommand::Unlock, &f, &mut sink).unwrap();
    assert_eq!(dev.state(), StateId::Monitoring);
    assert_eq!(
        dev.handle_command(DeviceCommand::Unlock, &f, &mut sink),
        Err(Error::Command(CommandError::NotLocked))
    );

    dev.handle_command(DeviceCommand::PowerOff, &f, &mut sink).unwrap();
    assert_eq!(dev.state(), StateId::Off);
    assert!(dev.tick(&f, &mut sink).is_none());
}

#[test]
fn unlock_runs_first_cycle_immediately() {
    let mut dev = Device::new(quiet_config()).unwrap();
    let mut sink = RecordingSink::new();
    let f = MockFaults::healthy();

    dev.handle_command(DeviceCommand::PowerOn, &f, &mut sink).unwrap();
    dev.handle_command(DeviceCommand::Unlock, &f, &mut sink).unwrap();

    assert_eq!(dev.clock().now(), SimTime(5));
    assert_eq!(
        sink.count(|e| matches!(e, DeviceEvent::Snapshot(_))),
        1
    );
}

#[test]
fn first_cycle_starts_basal_at_profile_rate() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let snap = dev.tick(&MockFaults::healthy(), &mut sink).unwrap();

    assert_eq!(snap.basal_rate, 0.8);
    assert!(sink.has_log(LogKind::Info, "Resumed basal rate"));
    // Basal delivery uses the rate set earlier in the same tick.
    assert!((snap.metrics.basal_delivered - 0.8 / 12.0).abs() < 1e-9);
}

#[test]
fn paused_clock_holds_simulated_time() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    dev.tick(&f, &mut sink).unwrap();
    dev.handle_command(DeviceCommand::Pause, &f, &mut sink).unwrap();
    assert!(dev.tick(&f, &mut sink).is_none());
    assert!(dev.tick(&f, &mut sink).is_none());
    assert_eq!(dev.clock().now(), SimTime(5));

    dev.handle_command(DeviceCommand::Resume, &f, &mut sink).unwrap();
    assert_eq!(dev.tick(&f, &mut sink).unwrap().time, SimTime(10));
}

#[test]
fn sim_rate_bounds() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    for bad in [0, 101] {
        assert_eq!(
            dev.handle_command(DeviceCommand::SetSimRate(bad), &f, &mut sink),
            Err(Error::Validation(ValidationError::SimRateOutOfRange))
        );
    }
    dev.handle_command(DeviceCommand::SetSimRate(20), &f, &mut sink).unwrap();
    assert_eq!(dev.clock().rate(), 20);
    assert_eq!(dev.clock().interval().as_millis(), 50);
}

fn draining_config(step: f64) -> SystemConfig {
    SystemConfig {
        battery_drain_per_tick: step,
        ..quiet_config()
    }
}

#[test]
fn flat_battery_powers_device_off() {
    let (mut dev, mut sink) = running_device(draining_config(0.5));
    let f = MockFaults::healthy();

    assert!(dev.tick(&f, &mut sink).is_some());
    assert!(dev.tick(&f, &mut sink).is_none());

    assert_eq!(dev.state(), StateId::Off);
    assert!(sink.has_log(LogKind::Error, "Battery depleted"));
    assert!(sink.events.contains(&DeviceEvent::StateChanged {
        from: StateId::Monitoring,
        to: StateId::Off
    }));

    assert_eq!(
        dev.handle_command(DeviceCommand::PowerOn, &f, &mut sink),
        Err(Error::Command(CommandError::BatteryDepleted))
    );
    dev.handle_command(DeviceCommand::ChargeBattery, &f, &mut sink).unwrap();
    dev.handle_command(DeviceCommand::PowerOn, &f, &mut sink).unwrap();
    assert_eq!(dev.state(), StateId::Locked);
}

#[test]
fn low_battery_alert_latches_until_charged() {
    let (mut dev, mut sink) = running_device(draining_config(0.3));
    let f = MockFaults::healthy();

    for _ in 0..3 {
        dev.tick(&f, &mut sink).unwrap();
    }
    assert!(dev.safety().is_active(AlertKind::BatteryLow));
    assert!(sink.events.contains(&DeviceEvent::AlertRaised(AlertKind::BatteryLow)));

    dev.handle_command(DeviceCommand::ChargeBattery, &f, &mut sink).unwrap();
    assert!(!dev.safety().is_active(AlertKind::BatteryLow));
    assert!(sink.events.contains(&DeviceEvent::AlertCleared(AlertKind::BatteryLow)));
    assert_eq!(dev.battery().level(), 1.0);
}

#[test]
fn power_off_discards_pending_extended_bolus() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    dev.handle_command(
        DeviceCommand::CalculateDose {
            glucose: 8.0,
            carbs: 0.0,
        },
        &f,
        &mut sink,
    )
    .unwrap();
    dev.handle_command(
        DeviceCommand::StartExtendedBolus {
            percent_now: 0.0,
            delay_minutes: 30,
        },
        &f,
        &mut sink,
    )
    .unwrap();
    assert!(dev.pump().schedule().is_some());

    dev.handle_command(DeviceCommand::PowerOff, &f, &mut sink).unwrap();
    assert!(dev.pump().schedule().is_none());
}

#[test]
fn queued_commands_apply_at_next_tick() {
    let (mut dev, mut sink) = running_device(quiet_config());
    let f = MockFaults::healthy();

    for _ in 0..COMMAND_QUEUE_CAP {
        dev.enqueue(DeviceCommand::SetSimRate(4)).unwrap();
    }
    assert_eq!(
        dev.enqueue(DeviceCommand::Pause),
        Err(Error::Queue(QueueError::Full))
    );
    assert_eq!(dev.clock().rate(), 1);

    dev.tick(&f, &mut sink).unwrap();
    assert_eq!(dev.pending_commands(), 0);
    assert_eq!(dev.clock().rate(), 4);
}

#[test]
fn queued_power_off_stops_the_tick() {
    let (mut dev, mut sink) = running_device(quiet_config());
    dev.enqueue(DeviceCommand::PowerOff).unwrap();
    assert!(dev.tick(&MockFaults::healthy(), &mut sink).is_none());
    assert_eq!(dev.state(), StateId::Off);
}
