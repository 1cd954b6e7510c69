//! Safety invariants over an end-of-tick [`DeviceSnapshot`].
//!
//! Each check is a plain predicate; [`check`] reports the first one that
//! fails.  Property tests run these after every step of a random command
//! and fault sequence.

use crate::alerts::AlertKind;
use crate::app::events::DeviceSnapshot;
use crate::drivers::pump::PumpMode;
use crate::fsm::StateId;

/// Cartridge never goes negative.
pub fn reserve_non_negative(s: &DeviceSnapshot) -> bool {
    s.insulin_remaining >= 0.0
}

/// Insulin on board never goes negative.
pub fn iob_non_negative(s: &DeviceSnapshot) -> bool {
    s.iob >= 0.0
}

pub fn battery_in_range(s: &DeviceSnapshot) -> bool {
    (0.0..=1.0).contains(&s.battery_level)
}

/// A connected reading is never below zero.
pub fn glucose_non_negative(s: &DeviceSnapshot) -> bool {
    s.glucose.value().is_none_or(|g| g >= 0.0)
}

pub fn basal_rate_non_negative(s: &DeviceSnapshot) -> bool {
    s.basal_rate >= 0.0
}

/// `status_code` agrees with the pump mode.
pub fn status_code_matches_mode(s: &DeviceSnapshot) -> bool {
    let expected = match s.pump_mode {
        PumpMode::Emergency => 2,
        PumpMode::Suspended => 1,
        PumpMode::Idle | PumpMode::Delivering => 0,
    };
    s.status_code == expected
}

/// A suspended pump holds no bolus in flight.
pub fn suspended_has_no_bolus(s: &DeviceSnapshot) -> bool {
    s.pump_mode != PumpMode::Suspended || s.active_bolus.is_none()
}

/// A flat battery is never observed while powered.
pub fn powered_has_charge(s: &DeviceSnapshot) -> bool {
    s.power == StateId::Off || s.battery_level > 0.0
}

/// A disconnected sample always comes with the CGM alert.
pub fn disconnect_has_cgm_alert(s: &DeviceSnapshot) -> bool {
    !s.glucose.is_disconnected() || s.active_alerts.contains(&AlertKind::CgmDisconnected)
}

/// An occlusion alert always accompanies an emergency stop.
pub fn emergency_has_occlusion_alert(s: &DeviceSnapshot) -> bool {
    s.pump_mode != PumpMode::Emergency || s.active_alerts.contains(&AlertKind::PumpOcclusion)
}

/// The pump never delivers more than was requested of it.
pub fn delivered_within_requested(s: &DeviceSnapshot) -> bool {
    let m = &s.metrics;
    m.bolus_delivered <= m.bolus_requested + 1e-9 && m.basal_delivered <= m.basal_requested + 1e-9
}

/// All invariants with names for reporting.
pub const ALL_INVARIANTS: &[(&str, fn(&DeviceSnapshot) -> bool)] = &[
    ("reserve_non_negative", reserve_non_negative),
    ("iob_non_negative", iob_non_negative),
    ("battery_in_range", battery_in_range),
    ("glucose_non_negative", glucose_non_negative),
    ("basal_rate_non_negative", basal_rate_non_negative),
    ("status_code_matches_mode", status_code_matches_mode),
    ("suspended_has_no_bolus", suspended_has_no_bolus),
    ("powered_has_charge", powered_has_charge),
    ("disconnect_has_cgm_alert", disconnect_has_cgm_alert),
    ("emergency_has_occlusion_alert", emergency_has_occlusion_alert),
    ("delivered_within_requested", delivered_within_requested),
];

/// Name of the first violated invariant, if any.
pub fn check(snapshot: &DeviceSnapshot) -> Result<(), &'static str> {
    for (name, holds) in ALL_INVARIANTS {
        if !holds(snapshot) {
            return Err(*name);
        }
    }
    Ok(())
}
