//! Continuous glucose monitor simulation.
//!
//! Each sample advances a simple glucose model by one tick:
//!
//! ```text
//!   reading += rise/tick * (1 + noise)         noise ~ U(-1, 1) * volatility
//!   absorbed = min(usage/tick, iob)
//!   reading -= absorbed * correction_factor    bloodstream.absorb(absorbed)
//! ```
//!
//! The physiology keeps running while the sensor link is down; only the
//! reported sample changes to [`GlucoseSample::Disconnected`].

use core::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::bloodstream::Bloodstream;
use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// One CGM reading, or the marker for a lost sensor link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "mmol_l", rename_all = "snake_case")]
pub enum GlucoseSample {
    Reading(f64),
    Disconnected,
}

impl GlucoseSample {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Reading(v) => Some(v),
            Self::Disconnected => None,
        }
    }

    pub fn is_disconnected(self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for GlucoseSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading(v) => write!(f, "{v:.1} mmol/L"),
            Self::Disconnected => write!(f, "-- (disconnected)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Per-tick model constants, derived from [`SystemConfig`].
#[derive(Debug, Clone, Copy)]
pub struct CgmParams {
    pub rise_per_hour: f64,
    pub insulin_usage_per_hour: f64,
    pub volatility: f64,
    pub ticks_per_hour: f64,
}

impl From<&SystemConfig> for CgmParams {
    fn from(c: &SystemConfig) -> Self {
        Self {
            rise_per_hour: c.cgm_rise_per_hour,
            insulin_usage_per_hour: c.cgm_insulin_usage_per_hour,
            volatility: c.cgm_volatility,
            ticks_per_hour: c.ticks_per_hour(),
        }
    }
}

pub struct GlucoseModel {
    reading: f64,
    params: CgmParams,
    rng: StdRng,
}

impl GlucoseModel {
    /// `seed = None` draws the noise from OS entropy.
    pub fn new(start_glucose: f64, params: CgmParams, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            reading: start_glucose,
            params,
            rng,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.cgm_start_glucose, CgmParams::from(config), config.rng_seed)
    }

    /// Underlying glucose level, regardless of sensor link state.
    pub fn reading(&self) -> f64 {
        self.reading
    }

    /// Advance the model one tick and report what the sensor sees.
    pub fn sample(
        &mut self,
        bloodstream: &mut Bloodstream,
        correction_factor: f64,
        link_up: bool,
    ) -> GlucoseSample {
        let p = self.params;
        let variance = if p.volatility > 0.0 {
            self.rng.gen_range(-1.0..=1.0) * p.volatility
        } else {
            0.0
        };
        let rise = p.rise_per_hour / p.ticks_per_hour;
        self.reading += rise * (1.0 + variance);

        let absorbed = (p.insulin_usage_per_hour / p.ticks_per_hour)
            .min(bloodstream.iob())
            .max(0.0);
        self.reading = (self.reading - absorbed * correction_factor).max(0.0);
        bloodstream.absorb(absorbed);

        if link_up {
            GlucoseSample::Reading(self.reading)
        } else {
            GlucoseSample::Disconnected
        }
    }

    /// Carbohydrate intake, already converted to mmol/L.
    pub fn intake_glucose(&mut self, mmol: f64) {
        self.reading += mmol.max(0.0);
    }
}
