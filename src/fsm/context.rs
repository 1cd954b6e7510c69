//! Context threaded through every power-state handler.
//!
//! The device service writes the battery level before each FSM tick and
//! reads `monitoring` afterwards to decide whether the closed loop runs.

pub struct FsmContext {
    // -- Inputs --
    /// Battery level (0.0-1.0), updated before each FSM tick.
    pub battery_level: f64,

    // -- Outputs --
    /// True while the closed loop should run.
    pub monitoring: bool,
}

impl FsmContext {
    pub fn new(battery_level: f64) -> Self {
        Self {
            battery_level,
            monitoring: false,
        }
    }

    pub fn battery_dead(&self) -> bool {
        self.battery_level <= 0.0
    }
}
