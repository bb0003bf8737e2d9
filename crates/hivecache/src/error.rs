// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::sync::Arc;

/// Boxed error produced by embedder-supplied loaders and peer transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error from a cache operation.
///
/// The error is cheap to clone so that every caller coalesced onto one
/// failed load can receive it. Underlying loader and transport errors stay
/// reachable through [`std::error::Error::source`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The caller passed an empty key.
    #[error("key is required")]
    EmptyKey,

    /// The named group is not registered. Raised at the service boundary;
    /// maps to "not found" in a transport binding.
    #[error("no such group: {0}")]
    GroupNotFound(String),

    /// A wire path did not parse as `<base>/<group>/<key>`. Maps to
    /// "bad request" in a transport binding.
    #[error("malformed cache path: {0}")]
    BadPath(String),

    /// A wire response frame did not decode.
    #[error("malformed response frame: {0}")]
    BadFrame(String),

    /// The origin loader failed. Propagated to the caller unchanged and
    /// never cached.
    #[error("origin load failed")]
    Origin(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A remote peer failed or was unreachable. Inside the load pipeline
    /// this is logged and followed by the origin fallback rather than
    /// surfaced.
    #[error("peer fetch failed")]
    Peer(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a loader failure, preserving the source for inspection.
    #[must_use]
    pub fn origin(cause: BoxError) -> Self {
        Self::Origin(Arc::from(cause))
    }

    /// Wraps a peer-transport failure, preserving the source for inspection.
    #[must_use]
    pub fn peer(cause: BoxError) -> Self {
        Self::Peer(Arc::from(cause))
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_message_matches_contract() {
        assert_eq!(Error::EmptyKey.to_string(), "key is required");
    }

    #[test]
    fn origin_error_preserves_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "db down");
        let error = Error::origin(Box::new(cause));

        let source = std::error::Error::source(&error).expect("origin errors carry a source");
        let io = source.downcast_ref::<std::io::Error>().expect("source should be io::Error");
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn errors_clone_for_coalesced_delivery() {
        let error = Error::origin("flaky origin".into());
        let cloned = error.clone();
        assert_eq!(error.to_string(), cloned.to_string());
    }
}
