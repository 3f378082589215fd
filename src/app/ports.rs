//! Port traits: the boundary between the scheduling core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Scheduler / Framework (domain)
//! ```
//!
//! Driven adapters (network stack, clock, watchdog, key table) implement
//! these traits.  The [`Scheduler`](crate::scheduler::Scheduler) and
//! [`Framework`](super::service::Framework) consume them via generics, so
//! the core never touches the radio stack or hardware timers directly.
//!
//! [`Application`] is the driving side: the code that declares events and
//! is ticked by the framework.

use crate::error::Result;
use crate::events::Registry;
use crate::scheduler::EventControl;

// ───────────────────────────────────────────────────────────────
// Stack port (driven adapter: network stack → scheduler)
// ───────────────────────────────────────────────────────────────

/// What the scheduler needs from the network stack.
///
/// Endpoints are addressed two ways: by their identifier (1..=240 on a
/// typical device) and by their dense index (0..endpoint_count) into the
/// endpoint table.  The two must be a bijection.
pub trait StackPort {
    /// Interface the stack currently considers active.
    fn current_network_index(&self) -> u8;

    /// Number of configured endpoints.
    fn endpoint_count(&self) -> u8;

    /// Endpoint identifier at `index`.
    fn endpoint_at(&self, index: u8) -> Option<u8>;

    /// Dense index of `endpoint`, or `None` if it is not configured.
    fn endpoint_index(&self, endpoint: u8) -> Option<u8>;

    /// Interface an endpoint belongs to.
    fn endpoint_network_index(&self, endpoint: u8) -> Option<u8>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock.  Must be callable from interrupt context.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Watchdog port
// ───────────────────────────────────────────────────────────────

/// Hardware watchdog, fed once per framework tick.
pub trait Watchdog {
    fn feed(&self);
}

// ───────────────────────────────────────────────────────────────
// Security port (key table access for trust-center backup)
// ───────────────────────────────────────────────────────────────

/// Key-table and network-formation access used by [`crate::backup`].
pub trait SecurityPort {
    /// Short node id of this device.
    fn node_id(&self) -> u16;

    /// Extended PAN id of the current network.
    fn extended_pan_id(&self) -> [u8; 8];

    /// Number of entries in the link key table.
    fn key_table_size(&self) -> u8;

    /// Export the link key at `index`: `(device EUI64, plaintext key)`.
    /// `None` for empty entries.
    fn export_link_key(&self, index: u8) -> Option<([u8; 8], [u8; 16])>;

    /// True while joined to or forming a network.
    fn network_up(&self) -> bool;

    /// Write a link key table entry.
    fn import_link_key(&mut self, index: u8, device_id: &[u8; 8], key: &[u8; 16]) -> core::result::Result<(), SecurityError>;

    /// Erase a link key table entry.
    fn erase_link_key(&mut self, index: u8) -> core::result::Result<(), SecurityError>;

    /// Keep the imported key table when the network is next formed.
    fn preserve_keys_on_form(&mut self);

    /// Start forming a network on an unused PAN id with `extended_pan_id`.
    fn form_network(&mut self, extended_pan_id: &[u8; 8]) -> core::result::Result<(), SecurityError>;
}

/// Errors from [`SecurityPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityError {
    /// Index outside the key table.
    InvalidIndex,
    /// The stack refused the operation.
    Rejected,
}

impl core::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidIndex => write!(f, "invalid key table index"),
            Self::Rejected => write!(f, "rejected by stack"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Application (driving side)
// ───────────────────────────────────────────────────────────────

/// Application or protocol component hosted by the framework.
///
/// `register` runs first and declares every event; the handlers receive
/// `&mut Self`, so ids returned by the registry are usually kept in
/// fields.  The other hooks default to no-ops.
pub trait Application: Sized {
    /// Declare events.  Called once, before anything is armed.
    fn register(&mut self, events: &dyn Registry<Self>) -> Result<()>;

    /// Start-up hook, after registration.
    fn init(&mut self, _events: &dyn EventControl) -> Result<()> {
        Ok(())
    }

    /// Last start-up hook.
    fn init_done(&mut self, _events: &dyn EventControl) -> Result<()> {
        Ok(())
    }

    /// Called every tick, before due events run.
    fn tick(&mut self, _events: &dyn EventControl) -> Result<()> {
        Ok(())
    }
}
