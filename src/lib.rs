//! Insulin pump closed-loop simulator library.
//!
//! Exposes the device models and the [`app::service::Device`] core for the
//! binary, integration tests and fuzzing.  Nothing here touches stdin,
//! stdout or the wall clock except the adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod alerts;
pub mod app;
pub mod bloodstream;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod dosing;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod invariants;
pub mod profile;
pub mod safety;
pub mod scheduler;
pub mod sensors;
