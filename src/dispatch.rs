//! Run loop: dispatch every due slot once per pass.
//!
//! ```text
//!  lock ─▶ snapshot due (queue + ISR) ─▶ for each, in (due, seq) order:
//!            claim ─▶ push context ─▶ handler ─▶ pop context
//! ```
//!
//! The snapshot is taken up front, so a handler that arms another slot
//! for "now" does not extend the current pass.  Each entry is claimed
//! again just before dispatch: a slot re-armed or deactivated by an
//! earlier handler in the same pass is skipped.

use heapless::Vec;
use log::{debug, trace, warn};

use crate::app::ports::{Clock, StackPort};
use crate::config::{MAX_ISR_EVENTS, MAX_SLOTS};
use crate::error::{Fault, Result};
use crate::events::{Fired, Handler, Selector, SlotId};
use crate::scheduler::{Scheduler, TaskGuard};

const MAX_DUE: usize = MAX_SLOTS + MAX_ISR_EVENTS;

/// A due slot as observed at the start of the pass.
#[derive(Debug, Clone, Copy)]
struct Due {
    slot: SlotId,
    due_ms: u64,
    seq: u32,
    /// ISR table index for ISR slots.
    isr: Option<u8>,
}

/// What to run for one claimed slot.
struct Job<A> {
    fired: Fired,
    handler: Handler<A>,
    selector: Selector,
}

impl<A, S: StackPort, C: Clock> Scheduler<A, S, C> {
    /// Run every slot that is due now.  Returns how many handlers ran.
    ///
    /// The lock is held for the whole pass; handlers may re-enter any
    /// primitive.  A handler fault stops the pass after its context has
    /// been popped, and is returned.
    pub fn run_due_events(&self, app: &mut A) -> Result<usize> {
        let guard = self.lock()?;
        let now = self.clock().now_ms();
        let due = self.snapshot_due(&guard, now)?;
        if due.is_empty() {
            return Ok(0);
        }
        trace!("Dispatch: {} due at {}ms", due.len(), now);

        let mut dispatched = 0;
        for entry in &due {
            let Some(job) = self.claim(&guard, entry, now)? else {
                debug!("Dispatch: slot {} no longer due, skipped", entry.slot.0);
                continue;
            };
            self.dispatch(&guard, app, job)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Due task and ISR entries in dispatch order.
    fn snapshot_due(&self, guard: &TaskGuard<'_, A, S, C>, now: u64) -> Result<Vec<Due, MAX_DUE>> {
        let table = guard.table();
        let mut due: Vec<Due, MAX_DUE> = Vec::new();
        for e in table.queue.due_entries(now) {
            due.push(Due {
                slot: e.slot,
                due_ms: e.due_ms,
                seq: e.seq,
                isr: None,
            })
            .map_err(|_| Fault::QueueFull)?;
        }
        for (index, &slot) in table.isr_slots.iter().enumerate() {
            let state = self.isr_table().slot(index as u8);
            match state.deadline() {
                Some(due_ms) if due_ms <= now => {
                    due.push(Due {
                        slot,
                        due_ms,
                        seq: state.seq(),
                        isr: Some(index as u8),
                    })
                    .map_err(|_| Fault::QueueFull)?;
                }
                _ => {}
            }
        }
        due.sort_unstable_by_key(|d| (d.due_ms, d.seq));
        Ok(due)
    }

    /// Mark the slot inactive and look up its handler.  `None` if the slot
    /// changed since the snapshot.
    fn claim(&self, guard: &TaskGuard<'_, A, S, C>, due: &Due, now: u64) -> Result<Option<Job<A>>> {
        let mut table = guard.table();
        let claimed = match due.isr {
            Some(index) => self.isr_table().slot(index).claim(due.due_ms),
            None => table.queue.take_due(due.slot, due.seq, now),
        };
        if !claimed {
            return Ok(None);
        }
        let slot = *table.catalog.slot(due.slot)?;
        let desc = table.catalog.descriptor(slot.event)?;
        Ok(Some(Job {
            fired: Fired {
                event: slot.event,
                slot: due.slot,
                name: desc.name,
                network: None,
            },
            handler: desc.handler,
            selector: slot.selector,
        }))
    }

    fn dispatch(&self, guard: &TaskGuard<'_, A, S, C>, app: &mut A, mut job: Job<A>) -> Result<()> {
        let network = match job.selector {
            Selector::None => None,
            Selector::Network(index) => Some(index),
            Selector::Endpoint(ep) => Some(
                self.stack()
                    .endpoint_network_index(ep)
                    .ok_or(Fault::UnknownEndpoint(ep))?,
            ),
        };
        if let Some(index) = network {
            guard.push_context(index)?;
        }
        job.fired.network = network;
        debug!(
            "Dispatch: '{}' slot {} (network {:?})",
            job.fired.name, job.fired.slot.0, network
        );

        // No table borrow is live here; the handler may re-enter.
        let result = match (job.handler, job.selector) {
            (Handler::Endpoint(handler), Selector::Endpoint(ep)) => handler(app, self, ep),
            (Handler::Plain(handler), Selector::None | Selector::Network(_)) => handler(app, self, job.fired),
            _ => Err(Fault::HandlerShape),
        };

        if network.is_some() {
            guard.pop_context()?;
        }
        if let Err(fault) = result {
            warn!("Dispatch: '{}' failed: {}", job.fired.name, fault);
        }
        result
    }
}
