// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Consistent hashing over a ring of virtual nodes.
//!
//! Each peer is projected onto the ring `replicas` times; a key is owned by
//! the peer bound to the first virtual node at or after the key's hash,
//! wrapping around at the top of the ring. Replication smooths the key
//! distribution and limits how much ownership moves when the peer set
//! changes.
//!
//! The ring itself is not concurrency-safe; the enclosing peer pool
//! serializes mutation and lookup behind its own lock.
//!
//! # Examples
//!
//! ```
//! use hivecache_ring::HashRing;
//!
//! let mut ring = HashRing::new(50);
//! ring.add(["10.0.0.1:8001", "10.0.0.2:8001", "10.0.0.3:8001"]);
//!
//! let owner = ring.get("some-key").expect("ring is non-empty");
//! // Ownership is deterministic for a fixed peer set.
//! assert_eq!(ring.get("some-key"), Some(owner));
//! ```

use std::collections::HashMap;

/// Virtual nodes per peer when nothing else is configured.
pub const DEFAULT_REPLICAS: usize = 50;

/// Maps arbitrary bytes onto the 32-bit ring.
pub type HashFn = fn(&[u8]) -> u32;

/// A consistent-hash ring binding keys to peer identities.
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Virtual-node hashes, sorted ascending.
    vnodes: Vec<u32>,
    /// Virtual node → owning peer. Hash collisions overwrite silently.
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Creates a ring using CRC-32 as the hash.
    #[must_use]
    pub fn new(replicas: usize) -> Self {
        Self::with_hash(replicas, crc32fast::hash)
    }

    /// Creates a ring with a caller-supplied hash function.
    #[must_use]
    pub fn with_hash(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            vnodes: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Projects each peer onto the ring `replicas` times.
    ///
    /// Virtual node `i` of peer `p` hashes the concatenation of the decimal
    /// replica index and the peer identity. The vnode list is re-sorted
    /// after every addition.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let vnode = (self.hash)(format!("{i}{peer}").as_bytes());
                self.owners.insert(vnode, peer.to_owned());
                self.vnodes.push(vnode);
            }
        }
        self.vnodes.sort_unstable();
    }

    /// Returns the peer owning the key, or `None` when the ring is empty.
    ///
    /// Deterministic for a fixed peer set: the first virtual node whose
    /// hash is at or after the key's hash owns the key, wrapping to the
    /// lowest virtual node past the top of the ring.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.vnodes.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.vnodes.partition_point(|&vnode| vnode < hash);
        let vnode = self.vnodes[idx % self.vnodes.len()];
        self.owners.get(&vnode).map(String::as_str)
    }

    /// Returns true when no peers have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vnodes.is_empty()
    }
}

impl std::fmt::Debug for HashRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("vnodes", &self.vnodes.len())
            .finish_non_exhaustive()
    }
}
