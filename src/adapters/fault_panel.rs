//! Manual fault injection panel.
//!
//! Stands in for the CGM transmitter link and the pump's occlusion
//! detector.  The console toggles the lines; the device samples them
//! once per tick through [`FaultSignals`].

use log::warn;

use crate::app::ports::FaultSignals;

#[derive(Debug, Default, Clone, Copy)]
pub struct FaultPanel {
    cgm_fault: bool,
    pump_fault: bool,
}

impl FaultPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the CGM link fault; returns the new fault state.
    pub fn toggle_cgm(&mut self) -> bool {
        self.cgm_fault = !self.cgm_fault;
        warn!("FAULT | CGM link {}", if self.cgm_fault { "lost" } else { "restored" });
        self.cgm_fault
    }

    /// Flip the pump occlusion fault; returns the new fault state.
    pub fn toggle_pump(&mut self) -> bool {
        self.pump_fault = !self.pump_fault;
        warn!("FAULT | pump occlusion {}", if self.pump_fault { "injected" } else { "cleared" });
        self.pump_fault
    }

    pub fn set(&mut self, cgm_fault: bool, pump_fault: bool) {
        self.cgm_fault = cgm_fault;
        self.pump_fault = pump_fault;
    }
}

impl FaultSignals for FaultPanel {
    fn cgm_link_up(&self) -> bool {
        !self.cgm_fault
    }

    fn pump_error(&self) -> bool {
        self.pump_fault
    }
}
