//! Persistent key store.
//!
//! The only state that survives the arena reset. Values are looked up by
//! `(Key, type)` and stamped with the generation of their last access; an
//! entry that goes unread for the configured number of frames is evicted
//! at frame end.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::node::Key;

#[derive(Debug)]
struct Entry {
    value: Box<dyn Any>,
    generation: u64,
}

/// Cross-frame `Key -> value` map with access-based expiry.
#[derive(Debug)]
pub struct KeyStore {
    entries: HashMap<(Key, TypeId), Entry>,
    /// Current frame generation.
    generation: u64,
    /// Frames an entry may go unread before eviction.
    ttl: u64,
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new(2)
    }
}

impl KeyStore {
    pub fn new(ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            generation: 0,
            ttl: ttl.max(1),
        }
    }

    /// Start a new frame.
    pub fn begin_frame(&mut self) {
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mutable access to the value stored under `key`, created with
    /// `T::default()` on first use. Marks the entry as read this frame.
    ///
    /// Entries are keyed by type, so the downcast only fails for a store
    /// whose entries were written under the wrong `TypeId`.
    pub fn get_or_default<T: Default + 'static>(&mut self, key: Key) -> Option<&mut T> {
        let generation = self.generation;
        let entry = self
            .entries
            .entry((key, TypeId::of::<T>()))
            .or_insert_with(|| Entry {
                value: Box::new(T::default()),
                generation,
            });
        entry.generation = generation;
        entry.value.downcast_mut::<T>()
    }

    /// Read without creating or touching.
    pub fn peek<T: 'static>(&self, key: Key) -> Option<&T> {
        self.entries
            .get(&(key, TypeId::of::<T>()))
            .and_then(|entry| entry.value.downcast_ref::<T>())
    }

    pub fn contains(&self, key: Key) -> bool {
        self.entries.keys().any(|(k, _)| *k == key)
    }

    /// Frame end: drop entries unread for `ttl` consecutive frames.
    /// Returns how many were evicted.
    pub fn evict(&mut self) -> usize {
        let cutoff = self.generation.saturating_sub(self.ttl - 1);
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.generation >= cutoff);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
