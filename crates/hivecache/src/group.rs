// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Named cache groups and the lookup pipeline.
//!
//! A [`Group`] is a cache namespace with its own byte budget, origin
//! loader, and (optionally) peer routing. `get` follows the canonical
//! pipeline: local hit → owning peer → origin loader, with concurrent
//! loads of the same key coalesced into one execution.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, OnceLock},
};

use hivecache_store::{ByteView, ConcurrentCache};
use parking_lot::Mutex;
use soloflight::Flight;
use tracing::{Level, event};

use crate::{
    error::{Error, Result},
    peer::{FetchRequest, KeyLoader, PeerPicker, RemotePeer},
};

/// Process-wide registry of named groups.
static GROUPS: LazyLock<Mutex<HashMap<String, Arc<Group>>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Creates a group and registers it under `name`.
///
/// Registering a second group under an existing name is a programmer
/// error; it is logged and the new group replaces the old one.
///
/// # Examples
///
/// ```
/// use hivecache::{BoxError, LoaderFn, new_group};
///
/// let group = new_group(
///     "users",
///     64 * 1024,
///     LoaderFn::new(|key: String| async move {
///         Ok::<_, BoxError>(format!("user record {key}").into_bytes())
///     }),
/// );
/// assert_eq!(group.name(), "users");
/// ```
pub fn new_group(name: &str, capacity_bytes: u64, loader: impl KeyLoader + 'static) -> Arc<Group> {
    let group = Arc::new(Group {
        name: name.to_owned(),
        cache: ConcurrentCache::new(capacity_bytes),
        loader: Arc::new(loader),
        peers: OnceLock::new(),
        flight: Flight::new(),
    });
    let previous = GROUPS.lock().insert(name.to_owned(), Arc::clone(&group));
    if previous.is_some() {
        event!(Level::WARN, group = name, "group name re-registered; replacing the previous group");
    }
    group
}

/// Looks up a previously registered group.
#[must_use]
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    GROUPS.lock().get(name).cloned()
}

/// A named cache namespace.
///
/// Groups are cheap to share (`Arc`) and safe to use from any number of
/// tasks. Entries live until evicted by the group's own capacity pressure;
/// there is no cross-node invalidation.
pub struct Group {
    name: String,
    cache: ConcurrentCache,
    loader: Arc<dyn KeyLoader>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: Flight<String, Result<ByteView>>,
}

impl Group {
    /// The group's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wires in peer routing. Effective once: the first picker wins and
    /// later registrations are logged and ignored.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if self.peers.set(picker).is_err() {
            event!(Level::WARN, group = %self.name, "peer picker already registered; keeping the first");
        }
    }

    /// Fetches the value for a key.
    ///
    /// A local cache hit returns immediately. On a miss the load is
    /// coalesced per key: the owning peer is consulted first when peer
    /// routing is registered and the key hashes off-node; otherwise (or
    /// when the peer fails) the origin loader runs and its result
    /// populates the local cache. Loader errors propagate unchanged and
    /// are never cached.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyKey`] for an empty key, or [`Error::Origin`] when the
    /// origin loader fails.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }

        if let Some(view) = self.cache.get(key) {
            event!(Level::DEBUG, group = %self.name, key, "cache hit");
            return Ok(view);
        }

        self.load(key).await
    }

    /// Runs the miss pipeline with per-key duplicate suppression.
    async fn load(&self, key: &str) -> Result<ByteView> {
        self.flight.work(key.to_owned(), || self.load_uncoalesced(key)).await
    }

    async fn load_uncoalesced(&self, key: &str) -> Result<ByteView> {
        if let Some(picker) = self.peers.get() {
            if let Some(peer) = picker.pick(key) {
                match self.fetch_from_peer(peer.as_ref(), key).await {
                    // The remote node owns the entry; it is intentionally
                    // not copied into the local cache.
                    Ok(view) => return Ok(view),
                    Err(error) => {
                        event!(
                            Level::WARN,
                            group = %self.name,
                            key,
                            error = %error,
                            "peer fetch failed; falling back to origin"
                        );
                    }
                }
            }
        }

        let bytes = self.loader.load(key).await.map_err(Error::origin)?;
        let view = ByteView::from(bytes);
        self.cache.add(key, view.clone());
        Ok(view)
    }

    async fn fetch_from_peer(&self, peer: &dyn RemotePeer, key: &str) -> Result<ByteView> {
        let request = FetchRequest::new(self.name.as_str(), key);
        let response = peer.fetch(&request).await.map_err(Error::peer)?;
        Ok(ByteView::from(response.value))
    }

    /// Number of locally cached entries.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Payload bytes held by the local cache.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.cache.used_bytes()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("capacity_bytes", &self.cache.capacity_bytes())
            .finish_non_exhaustive()
    }
}
