//! Deferred-event scheduler for an embedded network-stack application
//! framework.
//!
//! Application and protocol components declare named events at start-up,
//! arm them to fire after a delay, and a cooperative run loop executes
//! due events once per framework tick.  Events may be replicated per
//! network interface or per endpoint; the scheduler resolves which
//! physical slot an operation targets.
//!
//! The core is host-testable: the network stack, clock and watchdog are
//! reached only through the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod backup;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod isr;
pub mod queue;
pub mod resolver;
pub mod scheduler;

pub use app::service::Framework;
pub use error::{Fault, Result};
pub use events::{EventId, Fired, Handler, IsrEventId, Registry};
pub use scheduler::{EventControl, Scheduler};
