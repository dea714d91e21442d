//! Sorted queue of timed callbacks.
//!
//! Entries are kept latest-first so the soonest callback always sits at the
//! end of the storage and is removed without shifting. Callbacks sharing a
//! due-time fire in the order they were scheduled.

use crate::slots::{DEFAULT_CAPACITY, Slots};
use crate::time::Ticks;
use crate::types::Callback;

/// A callback waiting for its due-time.
#[derive(Clone, Copy)]
pub struct ScheduledCallback<'a> {
    /// Callback to fire.
    pub callback: &'a dyn Callback,
    /// Absolute tick at which the callback becomes eligible.
    pub due: Ticks,
}

impl core::fmt::Debug for ScheduledCallback<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScheduledCallback")
            .field("due", &self.due)
            .finish_non_exhaustive()
    }
}

/// Growable, due-time ordered collection of callbacks.
pub struct TimedQueue<'a> {
    entries: Slots<ScheduledCallback<'a>>,
}

impl<'a> TimedQueue<'a> {
    /// Creates an empty queue with room for `capacity` callbacks.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Slots::with_capacity(capacity, "timed queue"),
        }
    }

    /// Creates an empty queue with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Inserts `callback` to fire once the clock reaches `due`.
    ///
    /// # Panics
    /// Panics when the queue cannot grow any further.
    pub fn schedule_at(&mut self, callback: &'a dyn Callback, due: Ticks) {
        // First slot whose entry is due no later than the new one; landing in
        // front of equal due-times makes them fire first.
        let index = self
            .entries
            .as_slice()
            .partition_point(|entry| entry.due > due);

        self.entries
            .insert(index, ScheduledCallback { callback, due });
    }

    /// Removes and returns the soonest callback if it is due at `now`.
    pub fn pop_due(&mut self, now: Ticks) -> Option<&'a dyn Callback> {
        if self.next_due()? > now {
            return None;
        }
        self.entries.pop().map(|entry| entry.callback)
    }

    /// Number of callbacks due at `now`.
    pub fn due_count(&self, now: Ticks) -> usize {
        let slice = self.entries.as_slice();
        slice.len() - slice.partition_point(|entry| entry.due > now)
    }

    /// Fires and removes every callback due at `now`, soonest first.
    ///
    /// Returns the number of callbacks fired.
    pub fn service_due(&mut self, now: Ticks) -> usize {
        let mut fired = 0;
        while let Some(callback) = self.pop_due(now) {
            callback.fire();
            fired += 1;
        }
        fired
    }

    /// Due-time of the soonest callback.
    pub fn next_due(&self) -> Option<Ticks> {
        self.entries.as_slice().last().map(|entry| entry.due)
    }

    /// Due-times in firing order.
    pub fn due_times(&self) -> impl Iterator<Item = Ticks> + '_ {
        self.entries.as_slice().iter().rev().map(|entry| entry.due)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    /// Current capacity. Grows on demand and never shrinks.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

impl Default for TimedQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}
