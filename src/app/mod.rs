//! Application core — pure domain logic, zero I/O.
//!
//! Orchestrates one simulated pump: power FSM, per-tick closed loop,
//! safety evaluation and the user's bolus workflow.  All interaction with
//! the outside world happens through the **port traits** in [`ports`],
//! keeping this layer fully testable without a terminal or files.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
