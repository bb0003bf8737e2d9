// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The recency list: a doubly-linked FIFO with random unlink.
//!
//! Entries sit oldest-at-head, newest-at-tail. Two counters track the list's
//! state and can be read without the lock: `len` (entry count) and
//! `used_bytes` (sum of payload lengths of linked entries). Link mutations
//! are serialized through a single mutex; `unlink` is idempotent, so the
//! unlink/dequeue interleavings that plague an uncoordinated lock-free
//! variant cannot double-remove. Dequeued entries are retired in the same
//! critical section and can never be linked again; detached entries are
//! reclaimed by reference counting once the last reader drops its handle.

use std::sync::{
    Arc,
    atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed},
};

use parking_lot::Mutex;

use crate::{
    entry::{DETACHED, EVICTED, Entry},
    view::ByteView,
};

/// One arena cell. Vacant cells chain through `next` to form the free list.
struct Cell {
    prev: usize,
    next: usize,
    entry: Option<Arc<Entry>>,
}

const NIL: usize = usize::MAX;

/// Link structure guarded by the list mutex.
struct Links {
    cells: Vec<Cell>,
    free: usize,
    head: usize,
    tail: usize,
}

impl Links {
    fn new() -> Self {
        Self {
            cells: Vec::new(),
            free: NIL,
            head: NIL,
            tail: NIL,
        }
    }

    /// Takes a vacant cell (or grows the arena) and stores the entry in it.
    fn alloc(&mut self, entry: Arc<Entry>) -> usize {
        if self.free != NIL {
            let idx = self.free;
            self.free = self.cells[idx].next;
            let cell = &mut self.cells[idx];
            cell.prev = NIL;
            cell.next = NIL;
            cell.entry = Some(entry);
            idx
        } else {
            self.cells.push(Cell {
                prev: NIL,
                next: NIL,
                entry: Some(entry),
            });
            self.cells.len() - 1
        }
    }

    /// Returns the cell to the free list and hands back its entry.
    fn release(&mut self, idx: usize) -> Arc<Entry> {
        let cell = &mut self.cells[idx];
        let entry = cell.entry.take().expect("released cell must be occupied");
        cell.prev = NIL;
        cell.next = self.free;
        self.free = idx;
        entry
    }

    /// Hooks the cell in at the tail (newest position).
    fn attach_tail(&mut self, idx: usize) {
        self.cells[idx].prev = self.tail;
        self.cells[idx].next = NIL;
        if self.tail != NIL {
            self.cells[self.tail].next = idx;
        } else {
            self.head = idx;
        }
        self.tail = idx;
    }

    /// Unhooks the cell from the chain without freeing it.
    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.cells[idx].prev, self.cells[idx].next);
        if prev != NIL {
            self.cells[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.cells[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.cells[idx].prev = NIL;
        self.cells[idx].next = NIL;
    }
}

/// FIFO recency list with byte accounting.
///
/// All operations take the link mutex for a short, suspension-free critical
/// section. The counters are plain atomics: they may lag an in-flight
/// operation but converge to the exact truth at quiescence.
pub(crate) struct RecencyList {
    links: Mutex<Links>,
    len: AtomicUsize,
    used_bytes: AtomicU64,
}

impl RecencyList {
    pub(crate) fn new() -> Self {
        Self {
            links: Mutex::new(Links::new()),
            len: AtomicUsize::new(0),
            used_bytes: AtomicU64::new(0),
        }
    }

    /// Number of linked entries.
    pub(crate) fn len(&self) -> usize {
        self.len.load(Relaxed)
    }

    /// Sum of the payload lengths of all linked entries.
    pub(crate) fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Relaxed)
    }

    /// Attaches the entry at the tail (newest). If the entry is already
    /// linked it is moved to the tail instead, with no accounting change,
    /// so an entry can never occupy two positions. A retired entry is left
    /// untouched.
    pub(crate) fn push_back(&self, entry: &Arc<Entry>) {
        let mut links = self.links.lock();
        let idx = entry.slot().load(Relaxed);
        if idx == EVICTED {
            return;
        }
        if idx != DETACHED {
            links.detach(idx);
            links.attach_tail(idx);
            return;
        }
        let cost = entry.value().read().len() as u64;
        let idx = links.alloc(Arc::clone(entry));
        links.attach_tail(idx);
        entry.slot().store(idx, Relaxed);
        self.len.fetch_add(1, Relaxed);
        self.used_bytes.fetch_add(cost, Relaxed);
    }

    /// Replaces the entry's payload and moves it to the tail, adjusting
    /// `used_bytes` by the length difference. A merely detached entry is
    /// re-attached; a retired entry is refused and the caller must install
    /// a fresh one.
    ///
    /// Payload replacement happens only here, under the link mutex, which
    /// keeps the accounting exact: the cost subtracted on removal is always
    /// the cost that was added. Returns false without effect when the entry
    /// has been retired by [`pop_front`](Self::pop_front).
    pub(crate) fn requeue(&self, entry: &Arc<Entry>, value: ByteView) -> bool {
        let mut links = self.links.lock();
        let idx = entry.slot().load(Relaxed);
        if idx == EVICTED {
            return false;
        }
        let new_cost = value.len() as u64;
        if idx != DETACHED {
            let old_cost = entry.value().read().len() as u64;
            *entry.value().write() = value;
            links.detach(idx);
            links.attach_tail(idx);
            self.used_bytes.fetch_add(new_cost, Relaxed);
            self.used_bytes.fetch_sub(old_cost, Relaxed);
        } else {
            *entry.value().write() = value;
            let idx = links.alloc(Arc::clone(entry));
            links.attach_tail(idx);
            entry.slot().store(idx, Relaxed);
            self.len.fetch_add(1, Relaxed);
            self.used_bytes.fetch_add(new_cost, Relaxed);
        }
        true
    }

    /// Detaches and returns the oldest entry, or `None` when empty.
    ///
    /// The returned entry is retired, not merely detached: marking it dead
    /// in the same critical section closes the window in which a concurrent
    /// `requeue` could resurrect an entry whose map binding the evictor is
    /// about to drop.
    pub(crate) fn pop_front(&self) -> Option<Arc<Entry>> {
        let mut links = self.links.lock();
        let idx = links.head;
        if idx == NIL {
            return None;
        }
        links.detach(idx);
        let entry = links.release(idx);
        entry.slot().store(EVICTED, Relaxed);
        self.len.fetch_sub(1, Relaxed);
        let cost = entry.value().read().len() as u64;
        self.used_bytes.fetch_sub(cost, Relaxed);
        Some(entry)
    }

    /// Removes the entry from whatever position it occupies. Idempotent:
    /// returns false without effect when the entry is not linked.
    pub(crate) fn unlink(&self, entry: &Entry) -> bool {
        let mut links = self.links.lock();
        let idx = entry.slot().load(Relaxed);
        if idx == DETACHED || idx == EVICTED {
            return false;
        }
        links.detach(idx);
        let released = links.release(idx);
        released.slot().store(DETACHED, Relaxed);
        self.len.fetch_sub(1, Relaxed);
        let cost = released.value().read().len() as u64;
        self.used_bytes.fetch_sub(cost, Relaxed);
        true
    }

    /// Walks head→tail and collects the linked keys. Test support.
    #[cfg(test)]
    pub(crate) fn keys_oldest_first(&self) -> Vec<String> {
        let links = self.links.lock();
        let mut keys = Vec::new();
        let mut idx = links.head;
        while idx != NIL {
            let cell = &links.cells[idx];
            let entry = cell.entry.as_ref().expect("linked cell must be occupied");
            keys.push(entry.key().to_owned());
            idx = cell.next;
        }
        keys
    }
}
