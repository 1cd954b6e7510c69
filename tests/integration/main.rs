//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific workflow
//! against mock adapters.  Everything runs on the host with no terminal,
//! files or wall clock involved.

mod alert_tests;
mod bolus_tests;
mod mock_env;
mod power_tests;
