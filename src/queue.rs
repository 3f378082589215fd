//! Run queue of armed task slots.
//!
//! Entries are kept sorted by due time, ties broken by arming sequence,
//! so the due prefix is always in dispatch order.  A slot appears at most
//! once: re-arming replaces its entry.

use heapless::Vec;

use crate::config::MAX_SLOTS;
use crate::error::{Fault, Result};
use crate::events::SlotId;

/// One armed slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub slot: SlotId,
    pub due_ms: u64,
    /// Arming order, for tie-breaking.
    pub seq: u32,
}

impl Entry {
    fn key(&self) -> (u64, u32) {
        (self.due_ms, self.seq)
    }
}

/// Due-time ordered run queue.
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<Entry, MAX_SLOTS>,
}

impl TimerQueue {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Arm `slot` to be due `delay_ms` after `now_ms`, replacing any
    /// existing arming of the same slot.
    pub fn enqueue_with_delay(&mut self, slot: SlotId, now_ms: u64, delay_ms: u32, seq: u32) -> Result<()> {
        self.remove(slot);
        let entry = Entry {
            slot,
            due_ms: now_ms.saturating_add(delay_ms as u64),
            seq,
        };
        let pos = self
            .entries
            .iter()
            .position(|e| e.key() > entry.key())
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry).map_err(|_| Fault::QueueFull)
    }

    /// Drop `slot` from the queue.  Returns whether it was armed.
    pub fn remove(&mut self, slot: SlotId) -> bool {
        match self.entries.iter().position(|e| e.slot == slot) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn entry(&self, slot: SlotId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.slot == slot)
    }

    pub fn is_scheduled(&self, slot: SlotId) -> bool {
        self.entry(slot).is_some()
    }

    pub fn is_due(&self, slot: SlotId, now_ms: u64) -> bool {
        self.entry(slot).is_some_and(|e| e.due_ms <= now_ms)
    }

    /// Milliseconds until `slot` is due; `Some(0)` once overdue.
    pub fn remaining_ms(&self, slot: SlotId, now_ms: u64) -> Option<u32> {
        self.entry(slot).map(|e| saturating_ms(e.due_ms, now_ms))
    }

    /// Milliseconds until the earliest entry is due.
    pub fn ms_to_next_due(&self, now_ms: u64) -> Option<u32> {
        self.entries.first().map(|e| saturating_ms(e.due_ms, now_ms))
    }

    /// Due entries in dispatch order.
    pub fn due_entries(&self, now_ms: u64) -> impl Iterator<Item = Entry> + '_ {
        self.entries
            .iter()
            .take_while(move |e| e.due_ms <= now_ms)
            .copied()
    }

    /// Remove `slot` if it is still due under the arming `seq`.
    ///
    /// A slot re-armed or removed since `seq` was observed is left alone.
    pub fn take_due(&mut self, slot: SlotId, seq: u32, now_ms: u64) -> bool {
        if !self.is_due(slot, now_ms) {
            return false;
        }
        if self.entry(slot).is_some_and(|e| e.seq == seq) {
            self.remove(slot)
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `due - now` clamped to `0..=u32::MAX`.
pub(crate) fn saturating_ms(due_ms: u64, now_ms: u64) -> u32 {
    due_ms
        .saturating_sub(now_ms)
        .try_into()
        .unwrap_or(u32::MAX)
}
