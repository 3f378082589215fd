//! Scheduler configuration parameters
//!
//! Build-time capacities are constants; the rest is runtime-tunable and
//! can be loaded from persistent storage with serde.

use serde::{Deserialize, Serialize};

use crate::error::{Fault, Result};

/// Maximum number of logical event descriptors.
pub const MAX_EVENTS: usize = 32;
/// Maximum number of physical slots across all descriptors.
pub const MAX_SLOTS: usize = 64;
/// Maximum number of ISR-marked events.
pub const MAX_ISR_EVENTS: usize = 8;
/// Maximum number of network interfaces a build can support.
pub const MAX_NETWORKS: u8 = 4;
/// Maximum nesting of pushed network contexts.
pub const MAX_CONTEXT_DEPTH: usize = 4;

/// Core scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of network interfaces the stack supports (1..=MAX_NETWORKS).
    /// Network-replicated events get one slot per interface.
    pub supported_networks: u8,
    /// How long a task waits on the scheduler lock before it faults (ms).
    pub lock_timeout_ms: u32,
    /// Outer loop tick interval (ms)
    pub tick_interval_ms: u32,
    /// Upper bound on an idle sleep between ticks (ms)
    pub max_sleep_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            supported_networks: 1,
            lock_timeout_ms: 5_000,
            tick_interval_ms: 10,
            max_sleep_ms: 1_000,
        }
    }
}

impl SchedulerConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<()> {
        if self.supported_networks == 0 || self.supported_networks > MAX_NETWORKS {
            return Err(Fault::InvalidConfig("supported_networks out of range"));
        }
        if self.lock_timeout_ms == 0 {
            return Err(Fault::InvalidConfig("lock_timeout_ms must be non-zero"));
        }
        if self.tick_interval_ms == 0 {
            return Err(Fault::InvalidConfig("tick_interval_ms must be non-zero"));
        }
        if self.max_sleep_ms < self.tick_interval_ms {
            return Err(Fault::InvalidConfig("max_sleep_ms below tick_interval_ms"));
        }
        Ok(())
    }
}
