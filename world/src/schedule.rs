//! Time-ordered queue of pending vehicle animation ticks.

use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};

use harbor_core::ObjectId;

/// Single scheduled callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Entry {
    pub(crate) time: Duration,
    sequence: u64,
    pub(crate) target: ObjectId,
    pub(crate) data: u64,
}

/// Min-heap of entries keyed by due time. Entries due at the same time run
/// in the order they were queued.
#[derive(Debug, Default)]
pub(crate) struct TimeQueue {
    entries: BinaryHeap<Reverse<Entry>>,
    next_sequence: u64,
}

impl TimeQueue {
    pub(crate) fn enqueue(&mut self, time: Duration, target: ObjectId, data: u64) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.entries.push(Reverse(Entry {
            time,
            sequence,
            target,
            data,
        }));
    }

    pub(crate) fn contains(&self, target: ObjectId) -> bool {
        self.entries.iter().any(|Reverse(entry)| entry.target == target)
    }

    /// Drops every entry aimed at `target`.
    pub(crate) fn cancel(&mut self, target: ObjectId) {
        self.entries.retain(|Reverse(entry)| entry.target != target);
    }

    /// Pops the earliest entry due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<Entry> {
        let Reverse(head) = self.entries.peek()?;
        if head.time > now {
            return None;
        }
        self.entries.pop().map(|Reverse(entry)| entry)
    }
}
