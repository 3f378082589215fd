//! Event descriptor model.
//!
//! A logical event is declared once at start-up and never destroyed.
//! Multiplexed events own several physical slots, one per network
//! interface or endpoint.  The two levels live in separate fixed tables:
//!
//! ```text
//!  descriptors                          slots
//! ┌───────────────────────────┐       ┌─────────────────────────┐
//! │ 0 "tick"    Global      ──┼──────▶│ 0  Selector::None       │
//! │ 1 "rejoin"  Network{0}  ──┼──┬───▶│ 1  Selector::Network(0) │
//! │                           │  └───▶│ 2  Selector::Network(1) │
//! │ 2 "report"  Endpoint{0} ──┼──┬───▶│ 3  Selector::Endpoint(1)│
//! │                           │  └───▶│ 4  Selector::Endpoint(8)│
//! └───────────────────────────┘       └─────────────────────────┘
//! ```
//!
//! Only the due state of a slot changes at runtime, and that lives in the
//! run queue (task slots) or the ISR slot table, never here.

use heapless::Vec;
use log::{info, warn};

use crate::config::{MAX_EVENTS, MAX_SLOTS};
use crate::error::{Fault, Result};
use crate::scheduler::EventControl;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Handle to a logical event descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(pub(crate) u8);

/// Handle to one physical slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) u8);

impl SlotId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to an ISR-marked event.
///
/// Only [`IsrHandle`](crate::isr::IsrHandle) accepts this type, so an
/// ISR event cannot be armed through the locking task path by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsrEventId {
    pub(crate) event: EventId,
    pub(crate) slot: SlotId,
    pub(crate) index: u8,
}

impl IsrEventId {
    /// The underlying descriptor, for task-context queries.
    pub fn event(self) -> EventId {
        self.event
    }
}

// ---------------------------------------------------------------------------
// Multiplexing
// ---------------------------------------------------------------------------

/// How a descriptor maps onto physical slots.
///
/// `base` is the interface index (Network) or dense endpoint index
/// (Endpoint) that the first physical slot corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplex {
    Global,
    Network { base: u8 },
    Endpoint { base: u8 },
}

/// Per-slot binding to an interface or endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    None,
    Network(u8),
    Endpoint(u8),
}

/// Which access path may arm the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Armed from task context under the scheduler lock.
    Task,
    /// Armed from interrupt context, lock-free.  Carries the ISR table index.
    Isr(u8),
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// What a plain handler learns about the slot that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub event: EventId,
    pub slot: SlotId,
    pub name: &'static str,
    /// Interface pushed as current context for this call, if any.
    pub network: Option<u8>,
}

/// Handler for global and network events.
pub type PlainHandler<A> = fn(&mut A, &dyn EventControl, Fired) -> Result<()>;

/// Handler for endpoint events; receives the concrete endpoint.
pub type EndpointHandler<A> = fn(&mut A, &dyn EventControl, u8) -> Result<()>;

/// The two handler shapes.  Selected by multiplexing kind.
pub enum Handler<A> {
    Plain(PlainHandler<A>),
    Endpoint(EndpointHandler<A>),
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for Handler<A> {}

impl<A> core::fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Plain(_) => write!(f, "Handler::Plain"),
            Self::Endpoint(_) => write!(f, "Handler::Endpoint"),
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Declaration interface handed to applications at start-up.
pub trait Registry<A> {
    /// Declare one event.  `network` and `endpoint` are mutually
    /// exclusive; `None` means unset.
    fn register(
        &self,
        name: &'static str,
        handler: Handler<A>,
        network: Option<u8>,
        endpoint: Option<u8>,
    ) -> Result<EventId>;

    /// Declare an event replicated once per supported network.
    fn register_network(&self, name: &'static str, handler: PlainHandler<A>) -> Result<EventId>;

    /// Declare an event replicated once per configured endpoint.
    fn register_endpoint(&self, name: &'static str, handler: EndpointHandler<A>) -> Result<EventId>;

    /// Declare a global event armed from interrupt context.
    fn register_isr(&self, name: &'static str, handler: PlainHandler<A>) -> Result<IsrEventId>;
}

// ---------------------------------------------------------------------------
// Descriptor + slot rows
// ---------------------------------------------------------------------------

/// A declared event.  Immutable after registration.
#[derive(Debug)]
pub struct Descriptor<A> {
    pub name: &'static str,
    pub handler: Handler<A>,
    pub mux: Multiplex,
    pub marker: Marker,
    pub first_slot: SlotId,
    pub replicas: u8,
}

impl<A> Descriptor<A> {
    pub fn is_network(&self) -> bool {
        matches!(self.mux, Multiplex::Network { .. })
    }

    pub fn is_endpoint(&self) -> bool {
        matches!(self.mux, Multiplex::Endpoint { .. })
    }

    pub fn is_isr(&self) -> bool {
        matches!(self.marker, Marker::Isr(_))
    }
}

/// One physical slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub event: EventId,
    pub selector: Selector,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Fixed-capacity descriptor and slot tables.
pub struct Catalog<A> {
    descriptors: Vec<Descriptor<A>, MAX_EVENTS>,
    slots: Vec<Slot, MAX_SLOTS>,
}

impl<A> Default for Catalog<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Catalog<A> {
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Declare a descriptor with one slot per entry in `selectors`.
    pub fn declare(
        &mut self,
        name: &'static str,
        handler: Handler<A>,
        mux: Multiplex,
        marker: Marker,
        selectors: &[Selector],
    ) -> Result<EventId> {
        let endpoint_kind = matches!(mux, Multiplex::Endpoint { .. });
        let endpoint_handler = matches!(handler, Handler::Endpoint(_));
        if endpoint_kind != endpoint_handler {
            return Err(Fault::HandlerShape);
        }
        if selectors.is_empty() {
            warn!("Events: '{}' declared without slots, rejected", name);
            return Err(Fault::NoReplicas);
        }
        if self.descriptors.is_full() {
            return Err(Fault::RegistryFull);
        }
        if self.slots.len() + selectors.len() > MAX_SLOTS {
            return Err(Fault::SlotTableFull);
        }

        let event = EventId(self.descriptors.len() as u8);
        let first_slot = SlotId(self.slots.len() as u8);
        for &selector in selectors {
            self.slots
                .push(Slot { event, selector })
                .map_err(|_| Fault::SlotTableFull)?;
        }
        self.descriptors
            .push(Descriptor {
                name,
                handler,
                mux,
                marker,
                first_slot,
                replicas: selectors.len() as u8,
            })
            .map_err(|_| Fault::RegistryFull)?;

        info!(
            "Events: declared '{}' as {:?} ({} slot(s) from {})",
            name,
            mux,
            selectors.len(),
            first_slot.0
        );
        Ok(event)
    }

    pub fn descriptor(&self, event: EventId) -> Result<&Descriptor<A>> {
        self.descriptors
            .get(event.0 as usize)
            .ok_or(Fault::UnknownEvent)
    }

    pub fn slot(&self, slot: SlotId) -> Result<&Slot> {
        self.slots.get(slot.index()).ok_or(Fault::ReplicaOutOfRange)
    }

    /// Every slot owned by `event`, in replica order.
    pub fn slots_of(&self, event: EventId) -> Result<impl Iterator<Item = SlotId> + '_> {
        let desc = self.descriptor(event)?;
        let first = desc.first_slot.0;
        Ok((0..desc.replicas).map(move |offset| SlotId(first + offset)))
    }

    pub fn event_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
