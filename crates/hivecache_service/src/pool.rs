// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{collections::HashMap, sync::Arc};

use hivecache::{PeerPicker, RemotePeer};
use hivecache_ring::{DEFAULT_REPLICAS, HashRing};
use parking_lot::Mutex;
use tracing::{Level, event};

/// Ring-backed peer selection for one node.
///
/// The pool knows the node's own peer identity and holds the
/// consistent-hash ring plus one transport client per peer. Reconfiguring
/// the membership rebuilds both under the pool mutex, so in-flight picks
/// briefly block during a change. Picks that land on the node itself
/// return `None` — the caller then owns the key and loads from its origin.
///
/// The transport client for each peer is produced by the factory passed to
/// [`set_peers`](Self::set_peers); the pool itself never opens a socket.
pub struct PeerPool {
    self_addr: String,
    replicas: usize,
    state: Mutex<PoolState>,
}

struct PoolState {
    ring: HashRing,
    clients: HashMap<String, Arc<dyn RemotePeer>>,
}

impl PeerPool {
    /// Creates a pool for the node reachable at `self_addr`, with the
    /// default virtual-node replication factor.
    #[must_use]
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_replicas(self_addr, DEFAULT_REPLICAS)
    }

    /// Creates a pool with a custom virtual-node replication factor.
    #[must_use]
    pub fn with_replicas(self_addr: impl Into<String>, replicas: usize) -> Self {
        Self {
            self_addr: self_addr.into(),
            replicas,
            state: Mutex::new(PoolState {
                ring: HashRing::new(replicas),
                clients: HashMap::new(),
            }),
        }
    }

    /// This node's own peer identity.
    #[must_use]
    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Replaces the cluster membership.
    ///
    /// Rebuilds the ring from scratch and creates one client per peer via
    /// `factory`. The node's own address is normally part of `peers` so
    /// that every node agrees on the ring.
    pub fn set_peers<I, S>(&self, peers: I, factory: impl Fn(&str) -> Arc<dyn RemotePeer>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();

        let mut ring = HashRing::new(self.replicas);
        ring.add(&peers);
        let clients = peers.into_iter().map(|peer| {
            let client = factory(&peer);
            (peer, client)
        });

        let mut state = self.state.lock();
        state.ring = ring;
        state.clients = clients.collect();
    }
}

impl PeerPicker for PeerPool {
    fn pick(&self, key: &str) -> Option<Arc<dyn RemotePeer>> {
        let state = self.state.lock();
        let owner = state.ring.get(key)?;
        if owner == self.self_addr {
            return None;
        }
        event!(Level::DEBUG, peer = owner, key, "picked peer");
        state.clients.get(owner).cloned()
    }
}

impl std::fmt::Debug for PeerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerPool")
            .field("self_addr", &self.self_addr)
            .field("replicas", &self.replicas)
            .finish_non_exhaustive()
    }
}
