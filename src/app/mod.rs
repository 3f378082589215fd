//! Framework surface: ports and the init/tick service.
//!
//! The scheduling core in the crate root knows nothing about the network
//! stack, timers or the watchdog.  Everything external is reached through
//! the **port traits** in [`ports`]; [`service::Framework`] wires the
//! scheduler to them and drives start-up and the per-tick loop.

pub mod ports;
pub mod service;
