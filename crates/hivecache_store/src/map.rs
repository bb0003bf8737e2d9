// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::entry::Entry;

/// Number of shards in the key→entry map. Chosen to exceed typical thread
/// counts so that writers on distinct keys rarely contend.
const SHARD_COUNT: usize = 32;

/// Key→entry map partitioned into [`SHARD_COUNT`] shards, each behind its
/// own reader/writer lock. A key always hashes to the same shard, so one
/// operation touches exactly one lock. Handles are shared with the recency
/// list, not copied.
pub(crate) struct ShardedMap {
    shards: Vec<RwLock<HashMap<String, Arc<Entry>>>>,
}

impl ShardedMap {
    pub(crate) fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, key: &str) -> &RwLock<HashMap<String, Arc<Entry>>> {
        let hash = crc32fast::hash(key.as_bytes());
        &self.shards[hash as usize % SHARD_COUNT]
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<Entry>> {
        self.shard(key).read().get(key).cloned()
    }

    /// Returns the bound entry, installing the one produced by `make` if the
    /// key is unbound. Concurrent callers for the same key all receive the
    /// same handle.
    pub(crate) fn get_or_insert_with(&self, key: &str, make: impl FnOnce() -> Arc<Entry>) -> Arc<Entry> {
        let shard = self.shard(key);
        if let Some(entry) = shard.read().get(key) {
            return Arc::clone(entry);
        }
        let mut guard = shard.write();
        Arc::clone(guard.entry(key.to_owned()).or_insert_with(make))
    }

    /// Removes the binding only while it still points at `entry`.
    ///
    /// Keying the removal by identity keeps an eviction from deleting a
    /// newer binding that a concurrent insert installed for the same key.
    pub(crate) fn remove_if_same(&self, key: &str, entry: &Arc<Entry>) -> bool {
        let mut shard = self.shard(key).write();
        if shard.get(key).is_some_and(|bound| Arc::ptr_eq(bound, entry)) {
            shard.remove(key);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ByteView;

    fn entry(key: &str) -> Arc<Entry> {
        Arc::new(Entry::new(key, ByteView::from("v")))
    }

    #[test]
    fn insert_get_remove_round_trip() {
        let map = ShardedMap::new();
        assert!(map.get("k").is_none());

        let bound = map.get_or_insert_with("k", || entry("k"));
        let found = map.get("k").expect("entry should exist");
        assert_eq!(found.key(), "k");

        assert!(map.remove_if_same("k", &bound));
        assert!(map.get("k").is_none());
        assert!(!map.remove_if_same("k", &bound));
    }

    #[test]
    fn remove_spares_a_binding_that_was_replaced() {
        let map = ShardedMap::new();
        let stale = map.get_or_insert_with("k", || entry("k"));
        assert!(map.remove_if_same("k", &stale));

        let fresh = map.get_or_insert_with("k", || entry("k"));
        assert!(!map.remove_if_same("k", &stale), "a stale handle must not delete the new binding");
        let bound = map.get("k").expect("entry should exist");
        assert!(Arc::ptr_eq(&bound, &fresh));
    }

    #[test]
    fn get_or_insert_keeps_the_existing_binding() {
        let map = ShardedMap::new();
        let first = map.get_or_insert_with("k", || entry("k"));
        let second = map.get_or_insert_with("k", || entry("k"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn shard_selection_is_stable() {
        let map = ShardedMap::new();
        // Spread across shards and read everything back.
        for i in 0..200 {
            let key = format!("key-{i}");
            map.get_or_insert_with(&key, || entry(&key));
        }
        for i in 0..200 {
            let key = format!("key-{i}");
            assert_eq!(map.get(&key).expect("entry should exist").key(), key);
        }
    }
}
