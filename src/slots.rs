//! Growable entry storage with an explicit capacity policy.
//!
//! Both the timed-callback queue and the event registry keep their entries in
//! [`Slots`]. Capacity starts at a configured size and doubles whenever it is
//! exhausted, clamping once at [`MAX_ENTRIES`]. Running out past that point, or
//! failing to allocate, is fatal: the run-loop cannot continue with a
//! callback silently dropped.

use alloc::vec::Vec;

/// Most entries a queue or registry can hold, the range of a 16-bit count.
pub const MAX_ENTRIES: usize = u16::MAX as usize;

/// Capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Capacity after growing from `current`, `None` once [`MAX_ENTRIES`] is reached.
pub fn next_capacity(current: usize) -> Option<usize> {
    if current >= MAX_ENTRIES {
        None
    } else if current <= MAX_ENTRIES / 2 {
        Some((current * 2).max(1))
    } else {
        Some(MAX_ENTRIES)
    }
}

pub(crate) struct Slots<T> {
    items: Vec<T>,
    capacity: usize,
    kind: &'static str,
}

impl<T> Slots<T> {
    pub(crate) fn with_capacity(capacity: usize, kind: &'static str) -> Self {
        let capacity = capacity.min(MAX_ENTRIES);
        let mut items = Vec::new();
        if items.try_reserve_exact(capacity).is_err() {
            panic!("unable to allocate {} {} slots", capacity, kind);
        }

        Self {
            items,
            capacity,
            kind,
        }
    }

    /// Makes room for one more entry, growing the storage if it is full.
    ///
    /// # Panics
    /// Panics when [`MAX_ENTRIES`] entries are already stored or the
    /// allocation fails.
    pub(crate) fn reserve_one(&mut self) {
        if self.items.len() < self.capacity {
            return;
        }

        let Some(grown) = next_capacity(self.capacity) else {
            panic!(
                "more than {} {} entries requested, unable to continue",
                MAX_ENTRIES, self.kind
            );
        };

        if self
            .items
            .try_reserve_exact(grown - self.items.len())
            .is_err()
        {
            panic!("unable to allocate {} {} slots", grown, self.kind);
        }

        debug!("{}: capacity {} -> {}", self.kind, self.capacity, grown);
        self.capacity = grown;
    }

    pub(crate) fn push(&mut self, item: T) -> usize {
        self.reserve_one();
        self.items.push(item);
        self.items.len() - 1
    }

    pub(crate) fn insert(&mut self, index: usize, item: T) {
        self.reserve_one();
        self.items.insert(index, item);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Logical capacity. The allocation behind it may be larger.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        &self.items
    }
}
