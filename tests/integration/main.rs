//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no radio stack
//! or hardware timer required.

mod backup_tests;
mod lock_tests;
mod scheduler_tests;
