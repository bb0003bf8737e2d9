// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The seams between a cache group and the outside world.
//!
//! A group consumes two kinds of collaborators: a [`KeyLoader`] that
//! produces authoritative bytes when the cache misses and the node owns the
//! key, and a [`PeerPicker`]/[`RemotePeer`] pair that routes a key to the
//! cluster node owning it. Transports (HTTP, gRPC, …) implement these
//! traits outside the core.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BoxError;

/// Produces the authoritative bytes for a key on a cache miss.
///
/// Loaders may be called concurrently for different keys; the group's
/// request coalescing guarantees at most one in-flight load per key.
///
/// A plain closure can serve as a loader through [`LoaderFn`].
#[async_trait]
pub trait KeyLoader: Send + Sync {
    /// Fetches the bytes for `key` from the origin.
    async fn load(&self, key: &str) -> Result<Vec<u8>, BoxError>;
}

/// Adapts a closure into a [`KeyLoader`].
///
/// # Examples
///
/// ```
/// use hivecache::{BoxError, LoaderFn};
///
/// let loader = LoaderFn::new(|key: String| async move {
///     Ok::<_, BoxError>(format!("origin bytes for {key}").into_bytes())
/// });
/// # let _ = loader;
/// ```
pub struct LoaderFn<F>(F);

impl<F> LoaderFn<F> {
    /// Wraps the closure.
    pub fn new(func: F) -> Self {
        Self(func)
    }
}

#[async_trait]
impl<F, Fut> KeyLoader for LoaderFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<u8>, BoxError>> + Send + 'static,
{
    async fn load(&self, key: &str) -> Result<Vec<u8>, BoxError> {
        (self.0)(key.to_owned()).await
    }
}

/// A request addressed to the peer owning a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The cache namespace on the remote node.
    pub group: String,
    /// The key to fetch.
    pub key: String,
}

impl FetchRequest {
    /// Creates a request for the given group and key.
    #[must_use]
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }
}

/// The bytes returned by a peer for a [`FetchRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    /// The cached or loaded payload.
    pub value: Bytes,
}

/// A cluster node reachable through the peer transport.
#[async_trait]
pub trait RemotePeer: Send + Sync {
    /// Fetches the value for the request's key from the remote node.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, BoxError>;
}

/// Locates the peer that owns a key.
pub trait PeerPicker: Send + Sync {
    /// Returns the owning peer, or `None` when the key is owned by the
    /// local node or no peers are configured.
    fn pick(&self, key: &str) -> Option<Arc<dyn RemotePeer>>;
}
