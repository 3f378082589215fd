//! Scheduler: lock discipline and scheduling primitives.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Callers                               │
//! │                                                              │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌────────┐  │
//! │  │ App tasks  │  │ Protocol   │  │ Handlers   │  │  ISRs  │  │
//! │  │            │  │ components │  │ (re-entry) │  │        │  │
//! │  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘  └───┬────┘  │
//! │        │               │               │             │       │
//! │        ▼               ▼               ▼             ▼       │
//! │  ┌──────────────────────────────────────────┐  ┌──────────┐  │
//! │  │ TaskGuard (reentrant lock held)          │  │IsrHandle │  │
//! │  │   resolve ─▶ TimerQueue / context stack  │  │ atomics  │  │
//! │  └──────────────────────────────────────────┘  └──────────┘  │
//! │                          │                          │        │
//! │                          ▼                          ▼        │
//! │                  Scheduler::run_due_events (once per tick)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Task-context state sits in a `RefCell` inside a `parking_lot`
//! reentrant mutex.  The mutex serialises threads; the `RefCell` is only
//! borrowed for the span of one primitive and never across a handler
//! call, so a handler can re-enter any primitive while the run loop
//! holds the lock.

use core::cell::{RefCell, RefMut};
use core::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use heapless::Vec;
use log::{debug, info, warn};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::app::ports::{Clock, StackPort};
use crate::config::{MAX_ISR_EVENTS, MAX_SLOTS, SchedulerConfig};
use crate::context::NetworkContext;
use crate::error::{Fault, Result};
use crate::events::{
    Catalog, EndpointHandler, EventId, Handler, IsrEventId, Marker, Multiplex, PlainHandler, Registry,
    Selector, SlotId,
};
use crate::isr::{IsrHandle, IsrTable};
use crate::queue::TimerQueue;
use crate::resolver::{ResolveEnv, resolve};

// ═══════════════════════════════════════════════════════════════
//  Scheduling primitives
// ═══════════════════════════════════════════════════════════════

/// Task-context scheduling operations.
///
/// `endpoint` selects the replica of an endpoint event; `None` means the
/// current network's replica for network events, or the event itself.
pub trait EventControl {
    /// Arm the event to run `delay_ms` from now.  Re-arming overwrites.
    fn arm_after(&self, event: EventId, endpoint: Option<u8>, delay_ms: u32) -> Result<()>;

    /// Run as soon as possible.
    fn activate(&self, event: EventId, endpoint: Option<u8>) -> Result<()> {
        self.arm_after(event, endpoint, 0)
    }

    /// Cancel.  Idempotent.
    fn deactivate(&self, event: EventId, endpoint: Option<u8>) -> Result<()>;

    fn is_scheduled(&self, event: EventId, endpoint: Option<u8>) -> Result<bool>;

    /// Milliseconds until due, `None` if not scheduled.
    fn remaining_ms(&self, event: EventId, endpoint: Option<u8>) -> Result<Option<u32>>;

    /// Milliseconds until the earliest armed slot, `None` if idle.
    fn time_to_next_event(&self) -> Result<Option<u32>>;

    /// Interface network events currently resolve to.
    fn current_network(&self) -> Result<u8>;
}

// ═══════════════════════════════════════════════════════════════
//  Shared table
// ═══════════════════════════════════════════════════════════════

/// State guarded by the scheduler lock.
pub(crate) struct Table<A> {
    pub(crate) catalog: Catalog<A>,
    pub(crate) queue: TimerQueue,
    pub(crate) context: NetworkContext,
    /// Slot owned by each registered ISR event, by ISR index.
    pub(crate) isr_slots: Vec<SlotId, MAX_ISR_EVENTS>,
}

impl<A> Table<A> {
    const fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            queue: TimerQueue::new(),
            context: NetworkContext::new(),
            isr_slots: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// The event scheduler: an explicitly owned run queue plus its ports.
///
/// `A` is the application state handed to every handler.
pub struct Scheduler<A, S, C> {
    config: SchedulerConfig,
    stack: S,
    clock: C,
    table: ReentrantMutex<RefCell<Table<A>>>,
    isr: IsrTable,
    /// Arming sequence shared by task and ISR paths.
    seq: AtomicU32,
}

impl<A, S: StackPort, C: Clock> Scheduler<A, S, C> {
    /// Validate `config` and create an empty scheduler.
    pub fn new(config: SchedulerConfig, stack: S, clock: C) -> Result<Self> {
        config.validate()?;
        info!(
            "Scheduler: {} network(s), lock timeout {}ms",
            config.supported_networks, config.lock_timeout_ms
        );
        Ok(Self {
            config,
            stack,
            clock,
            table: ReentrantMutex::new(RefCell::new(Table::new())),
            isr: IsrTable::new(),
            seq: AtomicU32::new(0),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Acquire the scheduler lock for task-context access.
    ///
    /// Reentrant: a thread already holding the lock (e.g. a handler
    /// running inside [`run_due_events`](Self::run_due_events)) gets a
    /// nested guard immediately.
    pub fn lock(&self) -> Result<TaskGuard<'_, A, S, C>> {
        let timeout = Duration::from_millis(self.config.lock_timeout_ms as u64);
        match self.table.try_lock_for(timeout) {
            Some(guard) => Ok(TaskGuard { sched: self, guard }),
            None => {
                warn!("Scheduler: lock not acquired within {}ms", self.config.lock_timeout_ms);
                Err(Fault::LockTimeout)
            }
        }
    }

    /// Lock-free handle for interrupt context.
    pub fn isr(&self) -> IsrHandle<'_, C> {
        IsrHandle::new(&self.isr, &self.clock, &self.seq)
    }

    /// Number of declared events.
    pub fn event_count(&self) -> Result<usize> {
        Ok(self.lock()?.table().catalog.event_count())
    }

    /// Number of armed slots (task queue plus ISR slots).
    pub fn pending_count(&self) -> Result<usize> {
        let guard = self.lock()?;
        let table = guard.table();
        let isr_armed = (0..table.isr_slots.len())
            .filter(|&i| self.isr.slot(i as u8).deadline().is_some())
            .count();
        Ok(table.queue.len() + isr_armed)
    }

    /// Depth of the pushed network context.  Zero outside dispatch.
    pub fn context_depth(&self) -> Result<usize> {
        Ok(self.lock()?.table().context.depth())
    }

    pub(crate) fn isr_table(&self) -> &IsrTable {
        &self.isr
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Guarded task handle
// ═══════════════════════════════════════════════════════════════

/// Proof that the scheduler lock is held.  All task-context state is only
/// reachable through this type.
pub struct TaskGuard<'a, A, S, C> {
    sched: &'a Scheduler<A, S, C>,
    guard: ReentrantMutexGuard<'a, RefCell<Table<A>>>,
}

impl<A, S: StackPort, C: Clock> TaskGuard<'_, A, S, C> {
    pub(crate) fn table(&self) -> RefMut<'_, Table<A>> {
        self.guard.borrow_mut()
    }

    pub(crate) fn push_context(&self, network: u8) -> Result<()> {
        self.table().context.push(network)
    }

    pub(crate) fn pop_context(&self) -> Result<u8> {
        self.table().context.pop()
    }

    fn current_network_in(&self, table: &Table<A>) -> u8 {
        table
            .context
            .current()
            .unwrap_or_else(|| self.sched.stack.current_network_index())
    }

    fn resolve_in(&self, table: &Table<A>, event: EventId, endpoint: Option<u8>) -> Result<SlotId> {
        let env = ResolveEnv {
            current_network: self.current_network_in(table),
            supported_networks: self.sched.config.supported_networks,
        };
        resolve(&table.catalog, &self.sched.stack, env, event, endpoint)
    }

    /// Resolve and reject ISR events, for mutating primitives.
    fn resolve_task_slot(&self, table: &Table<A>, event: EventId, endpoint: Option<u8>) -> Result<SlotId> {
        let slot = self.resolve_in(table, event, endpoint)?;
        if table.catalog.descriptor(event)?.is_isr() {
            return Err(Fault::IsrOnlyEvent);
        }
        Ok(slot)
    }

    /// ISR table index of `event`, if it is ISR-marked.
    fn isr_index(table: &Table<A>, event: EventId) -> Result<Option<u8>> {
        Ok(match table.catalog.descriptor(event)?.marker {
            Marker::Isr(index) => Some(index),
            Marker::Task => None,
        })
    }
}

impl<A, S: StackPort, C: Clock> EventControl for TaskGuard<'_, A, S, C> {
    fn arm_after(&self, event: EventId, endpoint: Option<u8>, delay_ms: u32) -> Result<()> {
        let mut table = self.table();
        let slot = self.resolve_task_slot(&table, event, endpoint)?;
        let now = self.sched.clock.now_ms();
        let seq = self.sched.next_seq();
        table.queue.enqueue_with_delay(slot, now, delay_ms, seq)?;
        debug!(
            "Events: armed '{}' slot {} in {}ms",
            table.catalog.descriptor(event)?.name,
            slot.0,
            delay_ms
        );
        Ok(())
    }

    fn deactivate(&self, event: EventId, endpoint: Option<u8>) -> Result<()> {
        let mut table = self.table();
        let slot = self.resolve_task_slot(&table, event, endpoint)?;
        if table.queue.remove(slot) {
            debug!("Events: deactivated slot {}", slot.0);
        }
        Ok(())
    }

    fn is_scheduled(&self, event: EventId, endpoint: Option<u8>) -> Result<bool> {
        let table = self.table();
        let slot = self.resolve_in(&table, event, endpoint)?;
        Ok(match Self::isr_index(&table, event)? {
            Some(index) => self.sched.isr.slot(index).deadline().is_some(),
            None => table.queue.is_scheduled(slot),
        })
    }

    fn remaining_ms(&self, event: EventId, endpoint: Option<u8>) -> Result<Option<u32>> {
        let table = self.table();
        let slot = self.resolve_in(&table, event, endpoint)?;
        let now = self.sched.clock.now_ms();
        Ok(match Self::isr_index(&table, event)? {
            Some(index) => self
                .sched
                .isr
                .slot(index)
                .deadline()
                .map(|due| crate::queue::saturating_ms(due, now)),
            None => table.queue.remaining_ms(slot, now),
        })
    }

    fn time_to_next_event(&self) -> Result<Option<u32>> {
        let table = self.table();
        let now = self.sched.clock.now_ms();
        let task = table.queue.ms_to_next_due(now);
        let isr = self.sched.isr.ms_to_next_due(table.isr_slots.len(), now);
        Ok(match (task, isr) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        })
    }

    fn current_network(&self) -> Result<u8> {
        Ok(self.current_network_in(&self.table()))
    }
}

// Each call takes the lock for its own duration.
impl<A, S: StackPort, C: Clock> EventControl for Scheduler<A, S, C> {
    fn arm_after(&self, event: EventId, endpoint: Option<u8>, delay_ms: u32) -> Result<()> {
        self.lock()?.arm_after(event, endpoint, delay_ms)
    }

    fn deactivate(&self, event: EventId, endpoint: Option<u8>) -> Result<()> {
        self.lock()?.deactivate(event, endpoint)
    }

    fn is_scheduled(&self, event: EventId, endpoint: Option<u8>) -> Result<bool> {
        self.lock()?.is_scheduled(event, endpoint)
    }

    fn remaining_ms(&self, event: EventId, endpoint: Option<u8>) -> Result<Option<u32>> {
        self.lock()?.remaining_ms(event, endpoint)
    }

    fn time_to_next_event(&self) -> Result<Option<u32>> {
        self.lock()?.time_to_next_event()
    }

    fn current_network(&self) -> Result<u8> {
        self.lock()?.current_network()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Registration
// ═══════════════════════════════════════════════════════════════

impl<A, S: StackPort, C: Clock> Registry<A> for Scheduler<A, S, C> {
    fn register(
        &self,
        name: &'static str,
        handler: Handler<A>,
        network: Option<u8>,
        endpoint: Option<u8>,
    ) -> Result<EventId> {
        let (mux, selector) = match (network, endpoint) {
            (Some(_), Some(_)) => return Err(Fault::DualMultiplex),
            (Some(index), None) => (Multiplex::Network { base: index }, Selector::Network(index)),
            (None, Some(ep)) => {
                let dense = self.stack.endpoint_index(ep).ok_or(Fault::UnknownEndpoint(ep))?;
                (Multiplex::Endpoint { base: dense }, Selector::Endpoint(ep))
            }
            (None, None) => (Multiplex::Global, Selector::None),
        };
        let guard = self.lock()?;
        let mut table = guard.table();
        table.catalog.declare(name, handler, mux, Marker::Task, &[selector])
    }

    fn register_network(&self, name: &'static str, handler: PlainHandler<A>) -> Result<EventId> {
        let selectors: Vec<Selector, MAX_SLOTS> = (0..self.config.supported_networks)
            .map(Selector::Network)
            .collect();
        let guard = self.lock()?;
        let mut table = guard.table();
        table.catalog.declare(
            name,
            Handler::Plain(handler),
            Multiplex::Network { base: 0 },
            Marker::Task,
            &selectors,
        )
    }

    fn register_endpoint(&self, name: &'static str, handler: EndpointHandler<A>) -> Result<EventId> {
        let mut selectors: Vec<Selector, MAX_SLOTS> = Vec::new();
        for index in 0..self.stack.endpoint_count() {
            let ep = self.stack.endpoint_at(index).ok_or(Fault::ReplicaOutOfRange)?;
            selectors
                .push(Selector::Endpoint(ep))
                .map_err(|_| Fault::SlotTableFull)?;
        }
        let guard = self.lock()?;
        let mut table = guard.table();
        table.catalog.declare(
            name,
            Handler::Endpoint(handler),
            Multiplex::Endpoint { base: 0 },
            Marker::Task,
            &selectors,
        )
    }

    fn register_isr(&self, name: &'static str, handler: PlainHandler<A>) -> Result<IsrEventId> {
        let guard = self.lock()?;
        let mut table = guard.table();
        if table.isr_slots.is_full() {
            return Err(Fault::IsrTableFull);
        }
        let index = table.isr_slots.len() as u8;
        let event = table.catalog.declare(
            name,
            Handler::Plain(handler),
            Multiplex::Global,
            Marker::Isr(index),
            &[Selector::None],
        )?;
        let slot = table.catalog.descriptor(event)?.first_slot;
        table.isr_slots.push(slot).map_err(|_| Fault::IsrTableFull)?;
        Ok(IsrEventId { event, slot, index })
    }
}
