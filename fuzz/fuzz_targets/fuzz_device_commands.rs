//! Fuzz target: device command stream
//!
//! Decodes the input as a sequence of (opcode, argument) byte pairs and
//! drives the device core with commands, fault toggles and ticks:
//! - No panics under any command order
//! - Every end-of-tick snapshot passes `invariants::check`
//!
//! cargo fuzz run fuzz_device_commands

#![no_main]

use insulinpump::app::commands::DeviceCommand;
use insulinpump::app::events::DeviceEvent;
use insulinpump::app::ports::{EventSink, FaultSignals};
use insulinpump::app::service::Device;
use insulinpump::config::SystemConfig;
use insulinpump::invariants;
use libfuzzer_sys::fuzz_target;

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &DeviceEvent) {}
}

#[derive(Default)]
struct Faults {
    cgm_down: bool,
    occluded: bool,
}

impl FaultSignals for Faults {
    fn cgm_link_up(&self) -> bool {
        !self.cgm_down
    }
    fn pump_error(&self) -> bool {
        self.occluded
    }
}

fn decode(op: u8, arg: u8) -> Option<DeviceCommand> {
    let a = f64::from(arg);
    Some(match op % 16 {
        0 => DeviceCommand::PowerOn,
        1 => DeviceCommand::PowerOff,
        2 => DeviceCommand::Unlock,
        3 => DeviceCommand::CarbIntake { grams: a },
        4 => DeviceCommand::CalculateDose {
            glucose: a / 10.0,
            carbs: a,
        },
        5 => DeviceCommand::OverrideDose(a / 8.0),
        6 => DeviceCommand::ConfirmDeliver,
        7 => DeviceCommand::StartExtendedBolus {
            percent_now: a / 2.0,
            delay_minutes: u32::from(arg),
        },
        8 => DeviceCommand::CancelBolus,
        9 => DeviceCommand::ChargeBattery,
        10 => DeviceCommand::RefillInsulin,
        11 => DeviceCommand::SetSimRate(u32::from(arg)),
        _ => return None,
    })
}

fuzz_target!(|data: &[u8]| {
    let config = SystemConfig {
        rng_seed: Some(7),
        battery_drain_per_tick: 0.01,
        ..SystemConfig::default()
    };
    let Ok(mut dev) = Device::new(config) else {
        return;
    };
    let mut sink = NullSink;
    let mut faults = Faults::default();

    for pair in data.chunks_exact(2) {
        let (op, arg) = (pair[0], pair[1]);
        match op % 16 {
            12 => faults.cgm_down = !faults.cgm_down,
            13 => faults.occluded = !faults.occluded,
            14 | 15 => {
                if let Some(snap) = dev.tick(&faults, &mut sink) {
                    if let Err(name) = invariants::check(&snap) {
                        panic!("invariant '{name}' violated: {snap:?}");
                    }
                }
            }
            _ => {
                if let Some(cmd) = decode(op, arg) {
                    let _ = dev.handle_command(cmd, &faults, &mut sink);
                }
            }
        }
    }
});
