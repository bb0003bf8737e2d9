// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::{entry::Entry, list::RecencyList, map::ShardedMap, view::ByteView};

/// A concurrent, byte-budgeted LRU cache.
///
/// Composes the recency list with the sharded key→entry map. Inserting past
/// `capacity_bytes` evicts from the oldest end until the budget is met; a
/// capacity of 0 disables eviction entirely. Reads touch recency, so the
/// FIFO order degenerates into LRU under load.
///
/// The map and the list are not updated atomically with respect to each
/// other: a reader can observe a map hit whose entry a concurrent eviction
/// has just detached. The returned payload stays valid (entries are
/// reference counted) and the next lookup of that key misses.
///
/// # Examples
///
/// ```
/// use hivecache_store::{ByteView, ConcurrentCache};
///
/// let cache = ConcurrentCache::new(8);
/// cache.add("a", ByteView::from("1234"));
/// cache.add("b", ByteView::from("1234"));
/// cache.add("c", ByteView::from("1234")); // budget exceeded: "a" evicted
///
/// assert!(cache.get("a").is_none());
/// assert!(cache.get("b").is_some());
/// assert_eq!(cache.used_bytes(), 8);
/// ```
pub struct ConcurrentCache {
    capacity_bytes: u64,
    map: ShardedMap,
    list: RecencyList,
}

impl ConcurrentCache {
    /// Creates a cache with the given payload-byte budget. 0 means unbounded.
    #[must_use]
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            map: ShardedMap::new(),
            list: RecencyList::new(),
        }
    }

    /// Inserts or replaces the value for a key, then enforces the budget.
    ///
    /// Replacement keeps the existing entry: the payload is swapped, the
    /// entry moves to the newest position, and `used_bytes` changes by the
    /// length difference. Concurrent adds of the same key converge on one
    /// entry because the map hands every caller the same handle. A fresh
    /// entry is built with the caller's value, so the moment it becomes
    /// visible in the map it already carries real data.
    pub fn add(&self, key: &str, value: ByteView) {
        loop {
            let entry = self
                .map
                .get_or_insert_with(key, || Arc::new(Entry::new(key, value.clone())));
            if self.list.requeue(&entry, value.clone()) {
                break;
            }
            // The entry was retired by an eviction between the map lookup
            // and the relink. Clear the dead binding and install a fresh
            // entry on the next pass.
            self.map.remove_if_same(key, &entry);
        }
        self.evict();
    }

    /// Looks up a key, touching its recency on a hit.
    ///
    /// The touch is an unlink followed by a re-enqueue at the newest
    /// position. It is skipped when a concurrent eviction has already
    /// detached the entry; the snapshot payload is still returned.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let entry = self.map.get(key)?;
        if self.list.unlink(&entry) {
            self.list.push_back(&entry);
        }
        let value = entry.value().read().clone();
        Some(value)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the payload lengths of all cached entries.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.list.used_bytes()
    }

    /// The configured payload-byte budget. 0 means unbounded.
    #[must_use]
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Dequeues oldest entries until the budget is met. `used_bytes` only
    /// grows through `add`, so running this at the end of every `add` keeps
    /// the steady state at or below capacity.
    ///
    /// The dequeue retires the entry, so a concurrent `add` holding the
    /// same handle cannot relink it; the map removal is keyed by identity,
    /// so a fresh binding that add installs for the same key survives.
    fn evict(&self) {
        while self.capacity_bytes > 0 && self.list.used_bytes() > self.capacity_bytes {
            let Some(entry) = self.list.pop_front() else {
                break;
            };
            self.map.remove_if_same(entry.key(), &entry);
        }
    }
}
