//! Delivery hardware models: the pump controller and the insulin cartridge.

pub mod pump;
pub mod reservoir;

pub use pump::{ActiveBolus, BlockReason, BolusOutcome, PumpController, PumpMode, PumpTick};
pub use reservoir::InsulinReserve;
