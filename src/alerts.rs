//! Alert kinds and the deduplicating alert registry.
//!
//! Alerts are tracked as a bitmask, one bit per [`AlertKind`], so raising
//! an active alert or resetting an inactive one is a no-op by construction.

use core::fmt;

use serde::Serialize;

/// Every alert the device can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AlertKind {
    BatteryLow = 0b0000_0001,
    InsulinLow = 0b0000_0010,
    CgmDisconnected = 0b0000_0100,
    PumpOcclusion = 0b0000_1000,
    GlucoseLow = 0b0001_0000,
    GlucoseHigh = 0b0010_0000,
}

impl AlertKind {
    pub const ALL: [Self; 6] = [
        Self::BatteryLow,
        Self::InsulinLow,
        Self::CgmDisconnected,
        Self::PumpOcclusion,
        Self::GlucoseLow,
        Self::GlucoseHigh,
    ];

    /// Return the bitmask for this alert.
    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// Short title, also used as the log event text.
    pub fn title(self) -> &'static str {
        match self {
            Self::BatteryLow => "Low Battery",
            Self::InsulinLow => "Low Insulin",
            Self::CgmDisconnected => "CGM disconnected",
            Self::PumpOcclusion => "Pump occluded",
            Self::GlucoseLow => "Glucose went below minimum safe level",
            Self::GlucoseHigh => "Glucose went above maximum safe level",
        }
    }

    /// Text shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            Self::BatteryLow => "Battery low. Please plug in the device to charge.",
            Self::InsulinLow => "Insulin is running low. Please refill the reservoir.",
            Self::CgmDisconnected => "CGM disconnected, check sensor connection.",
            Self::PumpOcclusion => {
                "Insulin pump is occluded, insulin pumping has been suspended. \
                 Please check insertion point."
            }
            Self::GlucoseLow => {
                "Glucose is below 3.9 mmol/L. Take 15g of fast-acting sugar. Bolus suspended."
            }
            Self::GlucoseHigh => "Glucose is above target. Consider using the bolus calculator.",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Set of currently active alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertRegistry {
    active: u8,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `kind`.  Returns `true` only if it was inactive.
    pub fn raise(&mut self, kind: AlertKind) -> bool {
        let newly = self.active & kind.mask() == 0;
        self.active |= kind.mask();
        newly
    }

    /// Deactivate `kind`.  Returns `true` only if it was active.
    pub fn reset(&mut self, kind: AlertKind) -> bool {
        let was = self.active & kind.mask() != 0;
        self.active &= !kind.mask();
        was
    }

    pub fn is_active(&self, kind: AlertKind) -> bool {
        self.active & kind.mask() != 0
    }

    pub fn bits(&self) -> u8 {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Active alerts in declaration order.
    pub fn active(&self) -> impl Iterator<Item = AlertKind> + '_ {
        AlertKind::ALL.into_iter().filter(|k| self.is_active(*k))
    }
}
