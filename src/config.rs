//! System configuration parameters
//!
//! All tunable parameters for the simulator.
//! Values can be overridden from a JSON file (see
//! [`JsonConfigFile`](crate::adapters::config_file::JsonConfigFile)) or the CLI.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::Profile;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Timing ---
    /// Simulated minutes advanced by one tick
    pub tick_minutes: u32,
    /// Ticks per real second
    pub sim_rate: u32,
    /// Upper bound accepted by `setSimRate`
    pub max_sim_rate: u32,

    // --- Battery ---
    /// Level drained each tick (level is 0.0-1.0)
    pub battery_drain_per_tick: f64,
    /// Level at or below which the battery is critical
    pub battery_critical_level: f64,

    // --- Reservoir ---
    /// Cartridge capacity (U)
    pub reservoir_capacity_units: f64,
    /// Remaining units at or below which insulin is low
    pub reservoir_low_units: f64,

    // --- Delivery ---
    /// Rate used for manual and extended boluses (U/h)
    pub bolus_rate_units_per_hour: f64,
    /// Largest dose accepted as an override (U)
    pub max_override_dose: f64,
    /// Shortest extended-bolus delay (minutes)
    pub min_extended_delay_minutes: u32,
    /// Longest extended-bolus delay (minutes)
    pub max_extended_delay_minutes: u32,

    // --- CGM model ---
    /// Initial glucose reading (mmol/L)
    pub cgm_start_glucose: f64,
    /// Background glucose rise (mmol/L per hour)
    pub cgm_rise_per_hour: f64,
    /// Insulin absorbed from the bloodstream (U per hour)
    pub cgm_insulin_usage_per_hour: f64,
    /// Scale of the uniform noise applied to the rise term
    pub cgm_volatility: f64,
    /// Fixed seed for the CGM noise; `None` seeds from entropy
    pub rng_seed: Option<u64>,

    // --- Glucose safety ---
    /// Glucose below which boluses are suspended (mmol/L)
    pub low_glucose_limit: f64,
    /// Margin above target that raises the high-glucose alert (mmol/L)
    pub high_glucose_margin: f64,
    /// Half-width of the in-range band that clears glucose alerts (mmol/L)
    pub in_range_band: f64,

    // --- Therapy ---
    /// Profile active at start-up
    pub profile: Profile,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_minutes: 5, // 12 ticks per simulated hour
            sim_rate: 1,     // 1 tick per second
            max_sim_rate: 100,

            // Battery
            battery_drain_per_tick: 0.001,
            battery_critical_level: 0.15,

            // Reservoir
            reservoir_capacity_units: 300.0,
            reservoir_low_units: 30.0,

            // Delivery
            bolus_rate_units_per_hour: 10.0,
            max_override_dose: 25.0,
            min_extended_delay_minutes: 1,
            max_extended_delay_minutes: 240,

            // CGM model
            cgm_start_glucose: 6.0,
            cgm_rise_per_hour: 2.0,
            cgm_insulin_usage_per_hour: 2.0,
            cgm_volatility: 0.8,
            rng_seed: None,

            // Glucose safety
            low_glucose_limit: 3.9,
            high_glucose_margin: 2.0,
            in_range_band: 0.5,

            profile: Profile::default(),
        }
    }
}

impl SystemConfig {
    /// Number of ticks in one simulated hour.
    pub fn ticks_per_hour(&self) -> f64 {
        60.0 / f64::from(self.tick_minutes.max(1))
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_minutes == 0 || 60 % self.tick_minutes != 0 {
            return Err(Error::Config("tick_minutes must divide an hour"));
        }
        if self.max_sim_rate == 0 || !(1..=self.max_sim_rate).contains(&self.sim_rate) {
            return Err(Error::Config("sim_rate out of range"));
        }
        if !(0.0..=1.0).contains(&self.battery_drain_per_tick)
            || !(0.0..1.0).contains(&self.battery_critical_level)
        {
            return Err(Error::Config("battery parameters out of range"));
        }
        if self.reservoir_capacity_units <= 0.0
            || !(0.0..self.reservoir_capacity_units).contains(&self.reservoir_low_units)
        {
            return Err(Error::Config("reservoir parameters out of range"));
        }
        if self.bolus_rate_units_per_hour <= 0.0 || self.max_override_dose <= 0.0 {
            return Err(Error::Config("delivery parameters must be positive"));
        }
        if self.min_extended_delay_minutes == 0
            || self.min_extended_delay_minutes > self.max_extended_delay_minutes
        {
            return Err(Error::Config("extended delay range is empty"));
        }
        if self.cgm_volatility < 0.0 || self.cgm_insulin_usage_per_hour < 0.0 {
            return Err(Error::Config("CGM parameters must be non-negative"));
        }
        if self.low_glucose_limit <= 0.0 || self.high_glucose_margin <= 0.0 || self.in_range_band < 0.0 {
            return Err(Error::Config("glucose limits out of range"));
        }
        self.profile
            .validate()
            .map_err(|_| Error::Config("profile is invalid"))
    }
}
