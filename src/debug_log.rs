//! Bounded debug ring.
//!
//! A fixed arena of `N` entries with an explicit head index and count.
//! Appending never fails and never allocates: once the ring is full the
//! oldest slot is overwritten in place. Messages longer than
//! `DEBUG_MESSAGE_LEN` bytes are cut at a character boundary.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::{DEBUG_LOG_CAPACITY, DEBUG_MESSAGE_LEN};

/// One dispatched event as recorded for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugLogEntry {
    /// Monotonic, starts at 1 and never repeats while the device runs.
    pub seq: u32,
    pub timestamp_ms: u64,
    pub message: String<DEBUG_MESSAGE_LEN>,
}

impl DebugLogEntry {
    pub const fn empty() -> Self {
        Self {
            seq: 0,
            timestamp_ms: 0,
            message: String::new(),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Circular log of the last `N` entries.
pub struct DebugLog<const N: usize = DEBUG_LOG_CAPACITY> {
    slots: [DebugLogEntry; N],
    /// Slot the next append writes to.
    head: usize,
    count: usize,
    next_seq: u32,
}

impl<const N: usize> Default for DebugLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DebugLog<N> {
    pub const fn new() -> Self {
        Self {
            slots: [const { DebugLogEntry::empty() }; N],
            head: 0,
            count: 0,
            next_seq: 1,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append a plain message. Returns the entry's sequence number.
    pub fn append(&mut self, now_ms: u64, message: &str) -> u32 {
        self.append_fmt(now_ms, format_args!("{}", message))
    }

    /// Append a formatted message without an intermediate buffer.
    pub fn append_fmt(&mut self, now_ms: u64, args: fmt::Arguments<'_>) -> u32 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1).max(1);

        if N == 0 {
            return seq;
        }

        let slot = &mut self.slots[self.head];
        slot.seq = seq;
        slot.timestamp_ms = now_ms;
        slot.message.clear();
        // The writer swallows overflow, so this cannot fail.
        let _ = Truncate(&mut slot.message).write_fmt(args);

        self.head = (self.head + 1) % N;
        if self.count < N {
            self.count += 1;
        }
        seq
    }

    /// Up to `n` most recent entries, oldest first.
    pub fn last(&self, n: usize) -> impl Iterator<Item = &DebugLogEntry> + '_ {
        let take = n.min(self.count);
        // Index of the oldest entry we return.
        let start = (self.head + N - take) % N.max(1);
        (0..take).map(move |i| &self.slots[(start + i) % N])
    }

    /// Most recent entry, if any.
    pub fn latest(&self) -> Option<&DebugLogEntry> {
        self.last(1).next()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
    }
}

/// Writes into a bounded string, silently dropping whatever does not fit.
struct Truncate<'a, const M: usize>(&'a mut String<M>);

impl<const M: usize> Write for Truncate<'_, M> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}
