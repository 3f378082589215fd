//! Simulated watchdog.
//!
//! The main loop must call `feed()` on every framework tick.  On the host
//! there is nothing to reset, so feeds are only counted.

use core::sync::atomic::{AtomicU32, Ordering};

use log::info;

use crate::app::ports::Watchdog;

#[derive(Debug)]
pub struct SimWatchdog {
    feeds: AtomicU32,
}

impl Default for SimWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWatchdog {
    pub fn new() -> Self {
        info!("Watchdog(sim): counting feeds only");
        Self {
            feeds: AtomicU32::new(0),
        }
    }

    /// Number of feeds so far.
    pub fn feeds(&self) -> u32 {
        self.feeds.load(Ordering::Relaxed)
    }
}

impl Watchdog for SimWatchdog {
    fn feed(&self) {
        self.feeds.fetch_add(1, Ordering::Relaxed);
    }
}
