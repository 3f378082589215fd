//! Fault taxonomy for the event scheduler.
//!
//! Every invariant violation in the scheduling core funnels into
//! [`Fault`].  These are programming defects, not transient runtime
//! conditions: there is no retry path.  Callers propagate them with `?`
//! up to the single top-level [`halt`] handler, which keeps the core
//! testable without aborting the test process.
//!
//! Absence conditions (slot not scheduled, nothing due) are never faults;
//! they surface as `Option`/`bool`/`0` values.

use core::fmt;
use log::error;

// ---------------------------------------------------------------------------
// Unrecoverable faults
// ---------------------------------------------------------------------------

/// An unrecoverable scheduler fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// A descriptor was declared with both a network and an endpoint selector.
    DualMultiplex,
    /// An endpoint selector was passed for a descriptor that is not
    /// endpoint-multiplexed.
    NotEndpointEvent,
    /// The stack has no endpoint with this identifier.
    UnknownEndpoint(u8),
    /// Handler variant does not match the multiplexing kind.
    HandlerShape,
    /// Single-interface build, but a network event was declared for a
    /// non-zero interface.
    NetworkIndexMismatch,
    /// Resolution produced an offset outside the descriptor's replicas.
    ReplicaOutOfRange,
    /// A descriptor was declared with zero physical slots (e.g. an
    /// endpoint event on a stack with no endpoints).
    NoReplicas,
    /// The event id does not name a registered descriptor.
    UnknownEvent,
    /// Task-context mutation of an ISR-marked event.
    IsrOnlyEvent,
    /// The scheduler lock could not be acquired in time.
    LockTimeout,
    /// Too many nested context pushes.
    ContextOverflow,
    /// Context pop without a matching push.
    ContextUnderflow,
    /// Descriptor table is full.
    RegistryFull,
    /// Physical slot table is full.
    SlotTableFull,
    /// ISR slot table is full.
    IsrTableFull,
    /// Run queue is full.
    QueueFull,
    /// `Framework::init` was called twice.
    AlreadyInitialized,
    /// `Framework::tick` was called before `Framework::init`.
    NotInitialized,
    /// Configuration failed validation.
    InvalidConfig(&'static str),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DualMultiplex => write!(f, "event multiplexed by network and endpoint"),
            Self::NotEndpointEvent => write!(f, "endpoint given for non-endpoint event"),
            Self::UnknownEndpoint(ep) => write!(f, "unknown endpoint {ep}"),
            Self::HandlerShape => write!(f, "handler variant does not match event kind"),
            Self::NetworkIndexMismatch => {
                write!(f, "single-network build requires network-0 event")
            }
            Self::ReplicaOutOfRange => write!(f, "resolved slot outside event replicas"),
            Self::NoReplicas => write!(f, "event declared without slots"),
            Self::UnknownEvent => write!(f, "unknown event id"),
            Self::IsrOnlyEvent => write!(f, "ISR event mutated from task context"),
            Self::LockTimeout => write!(f, "scheduler lock acquisition timed out"),
            Self::ContextOverflow => write!(f, "network context stack overflow"),
            Self::ContextUnderflow => write!(f, "network context stack underflow"),
            Self::RegistryFull => write!(f, "event registry full"),
            Self::SlotTableFull => write!(f, "slot table full"),
            Self::IsrTableFull => write!(f, "ISR slot table full"),
            Self::QueueFull => write!(f, "run queue full"),
            Self::AlreadyInitialized => write!(f, "framework already initialised"),
            Self::NotInitialized => write!(f, "framework not initialised"),
            Self::InvalidConfig(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Fault {}

// ---------------------------------------------------------------------------
// Halt
// ---------------------------------------------------------------------------

/// Top-level halt handler.
///
/// Logs the fault and panics.  On target the panic handler stops the
/// firmware and the supervising watchdog resets the device.
#[cold]
pub fn halt(fault: Fault) -> ! {
    error!("FATAL scheduler fault: {fault}, halting");
    panic!("fatal scheduler fault: {fault}");
}

/// Unwrap a scheduler result or [`halt`].
pub fn or_halt<T>(result: Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(fault) => halt(fault),
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Scheduler-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Fault>;
