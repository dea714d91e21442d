//! Registered input pins and their last observed levels.
//!
//! The registry only stores data. Reading the hardware and deciding when to
//! scan is the driver's job; it feeds each sampled level back through
//! [`EventRegistry::observe`], which reports the callback to fire on a change.

use alloc::vec::Vec;

use crate::slots::{DEFAULT_CAPACITY, Slots};
use crate::types::{Callback, PortPin};

/// Last observed pin levels, one bit per registered pin.
///
/// Bit `i` lives in byte `i / 8` at position `i % 8`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinStateCache {
    bits: Vec<u8>,
    len: usize,
}

impl PinStateCache {
    /// Creates an empty cache.
    pub const fn new() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Appends a level and returns its index.
    pub fn push(&mut self, level: bool) -> usize {
        let index = self.len;
        if index % 8 == 0 {
            self.bits.push(0);
        }
        self.len += 1;
        self.set(index, level);
        index
    }

    /// Level stored at `index`.
    pub fn get(&self, index: usize) -> Option<bool> {
        if index >= self.len {
            return None;
        }
        Some(self.bits[index / 8] & (1 << (index % 8)) != 0)
    }

    /// Overwrites the level at `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, level: bool) {
        if index >= self.len {
            return;
        }
        let mask = 1 << (index % 8);
        if level {
            self.bits[index / 8] |= mask;
        } else {
            self.bits[index / 8] &= !mask;
        }
    }

    /// Number of stored levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Packed bytes backing the cache.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

struct PinEntry<'a> {
    pin: PortPin,
    callback: &'a dyn Callback,
}

/// Growable set of pins watched for level changes.
pub struct EventRegistry<'a> {
    entries: Slots<PinEntry<'a>>,
    levels: PinStateCache,
}

impl<'a> EventRegistry<'a> {
    /// Creates an empty registry with room for `capacity` pins.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Slots::with_capacity(capacity, "event registry"),
            levels: PinStateCache::new(),
        }
    }

    /// Creates an empty registry with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Appends `pin` with its currently sampled `level`. Returns the entry's index.
    ///
    /// # Panics
    /// Panics when the registry cannot grow any further.
    pub fn register(&mut self, pin: PortPin, callback: &'a dyn Callback, level: bool) -> usize {
        let index = self.entries.push(PinEntry { pin, callback });
        self.levels.push(level);
        index
    }

    /// Records a freshly sampled level for entry `index`.
    ///
    /// Returns the entry's callback when the level differs from the cached
    /// one; the cache already holds the new level by then.
    pub fn observe(&mut self, index: usize, level: bool) -> Option<&'a dyn Callback> {
        let cached = self.levels.get(index)?;
        if cached == level {
            return None;
        }
        self.levels.set(index, level);
        Some(self.entries.as_slice()[index].callback)
    }

    /// Pin watched by entry `index`.
    pub fn pin(&self, index: usize) -> Option<PortPin> {
        self.entries.as_slice().get(index).map(|entry| entry.pin)
    }

    /// Callback of entry `index`.
    pub fn callback(&self, index: usize) -> Option<&'a dyn Callback> {
        self.entries.as_slice().get(index).map(|entry| entry.callback)
    }

    /// Last level cached for entry `index`.
    pub fn cached_level(&self, index: usize) -> Option<bool> {
        self.levels.get(index)
    }

    /// Packed level cache.
    pub fn levels(&self) -> &PinStateCache {
        &self.levels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}

impl Default for EventRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}
