//! Lock-free path for ISR-marked events.
//!
//! Interrupt context must never block on the scheduler lock, so ISR slots
//! keep their due state in atomics instead of the run queue:
//!
//! ```text
//!   ISR ──arm/deactivate──▶ IsrSlot { deadline, seq } ◀──claim (CAS)── run loop
//! ```
//!
//! The ISR is the only writer of an armed deadline; the run loop only
//! clears it, by compare-exchange against the deadline it observed.  An
//! ISR re-arm to a different deadline racing the claim makes the CAS fail
//! and the slot runs on a later pass instead of being lost.  A re-arm to
//! the same deadline is indistinguishable from the observed arming and is
//! served by the dispatch that claims it: one handler call, not two.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use log::debug;

use crate::app::ports::Clock;
use crate::config::MAX_ISR_EVENTS;
use crate::events::IsrEventId;
use crate::queue::saturating_ms;

const NOT_ARMED: u64 = u64::MAX;

/// Due state of one ISR-marked slot.
#[derive(Debug)]
pub(crate) struct IsrSlot {
    deadline: AtomicU64,
    seq: AtomicU32,
}

impl IsrSlot {
    const fn new() -> Self {
        Self {
            deadline: AtomicU64::new(NOT_ARMED),
            seq: AtomicU32::new(0),
        }
    }

    fn arm(&self, due_ms: u64, seq: u32) {
        // An armed deadline must never read back as NOT_ARMED.
        self.seq.store(seq, Ordering::Relaxed);
        self.deadline.store(due_ms.min(NOT_ARMED - 1), Ordering::Release);
    }

    fn disarm(&self) {
        self.deadline.store(NOT_ARMED, Ordering::Release);
    }

    pub(crate) fn deadline(&self) -> Option<u64> {
        match self.deadline.load(Ordering::Acquire) {
            NOT_ARMED => None,
            due => Some(due),
        }
    }

    pub(crate) fn seq(&self) -> u32 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Mark inactive if still armed for `due_ms`.  Compares the deadline
    /// only, so re-arms to the same deadline collapse into one claim.
    pub(crate) fn claim(&self, due_ms: u64) -> bool {
        self.deadline
            .compare_exchange(due_ms, NOT_ARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Fixed table of ISR slot states.
#[derive(Debug)]
pub(crate) struct IsrTable {
    slots: [IsrSlot; MAX_ISR_EVENTS],
}

impl IsrTable {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [const { IsrSlot::new() }; MAX_ISR_EVENTS],
        }
    }

    pub(crate) fn slot(&self, index: u8) -> &IsrSlot {
        &self.slots[index as usize]
    }

    /// Milliseconds until the earliest armed ISR slot among the first
    /// `count` is due.
    pub(crate) fn ms_to_next_due(&self, count: usize, now_ms: u64) -> Option<u32> {
        self.slots[..count]
            .iter()
            .filter_map(IsrSlot::deadline)
            .min()
            .map(|due| saturating_ms(due, now_ms))
    }
}

// ---------------------------------------------------------------------------
// Interrupt-context handle
// ---------------------------------------------------------------------------

/// Unsynchronised scheduling handle for interrupt context.
///
/// Every operation is a handful of atomic loads/stores; none acquires the
/// scheduler lock.  Only accepts [`IsrEventId`]s.
pub struct IsrHandle<'a, C: Clock> {
    table: &'a IsrTable,
    clock: &'a C,
    seq: &'a AtomicU32,
}

impl<'a, C: Clock> IsrHandle<'a, C> {
    pub(crate) fn new(table: &'a IsrTable, clock: &'a C, seq: &'a AtomicU32) -> Self {
        Self { table, clock, seq }
    }

    /// Arm the event to run `delay_ms` from now.  Re-arming overwrites.
    pub fn arm_after(&self, event: IsrEventId, delay_ms: u32) {
        let now = self.clock.now_ms();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.table
            .slot(event.index)
            .arm(now.saturating_add(delay_ms as u64), seq);
        debug!("ISR: armed slot {} in {}ms", event.slot.0, delay_ms);
    }

    /// Run on the next pass.
    pub fn activate(&self, event: IsrEventId) {
        self.arm_after(event, 0);
    }

    pub fn deactivate(&self, event: IsrEventId) {
        self.table.slot(event.index).disarm();
    }

    pub fn is_scheduled(&self, event: IsrEventId) -> bool {
        self.table.slot(event.index).deadline().is_some()
    }

    pub fn remaining_ms(&self, event: IsrEventId) -> Option<u32> {
        let now = self.clock.now_ms();
        self.table
            .slot(event.index)
            .deadline()
            .map(|due| saturating_ms(due, now))
    }
}
