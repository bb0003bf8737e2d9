// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::atomic::AtomicUsize;

use parking_lot::RwLock;

use crate::view::ByteView;

/// Slot value meaning "not linked into the recency list".
pub(crate) const DETACHED: usize = usize::MAX;

/// Slot value meaning "dequeued by eviction". A retired entry is dead: it
/// is never linked again, and a writer holding its handle must install a
/// fresh entry instead.
pub(crate) const EVICTED: usize = usize::MAX - 1;

/// A cache entry shared between the key→entry map and the recency list.
///
/// The key is immutable after creation. The payload is replaced, never
/// mutated in place; replacement happens only under the recency-list lock
/// so that the byte accounting stays exact. `slot` is the entry's index in
/// the list arena, written only under the list lock.
pub(crate) struct Entry {
    key: String,
    value: RwLock<ByteView>,
    slot: AtomicUsize,
}

impl Entry {
    pub(crate) fn new(key: &str, value: ByteView) -> Self {
        Self {
            key: key.to_owned(),
            value: RwLock::new(value),
            slot: AtomicUsize::new(DETACHED),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn value(&self) -> &RwLock<ByteView> {
        &self.value
    }

    pub(crate) fn slot(&self) -> &AtomicUsize {
        &self.slot
    }
}
