// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Distributed in-memory key→bytes cache.
//!
//! A hivecache cluster is a set of peer nodes, any of which can answer any
//! key. The node that receives a request resolves ownership over a
//! consistent-hash ring: the owning peer serves the key from its cache (or
//! its origin loader), and results flow back to the caller. Named groups
//! isolate independent key spaces, each with its own byte budget and
//! loader.
//!
//! This crate is the cluster-agnostic core: the group controller, the
//! concurrent LRU store, per-key request coalescing, and the traits a
//! transport implements to plug in peer routing. The wire transport itself
//! lives outside the core; `hivecache_service` provides the
//! transport-agnostic pieces of the reference HTTP binding.
//!
//! # Examples
//!
//! ```
//! use hivecache::{BoxError, LoaderFn, new_group};
//!
//! # futures::executor::block_on(async {
//! let group = new_group(
//!     "scores",
//!     1024,
//!     LoaderFn::new(|key: String| async move {
//!         // Consult the authoritative source, e.g. a database.
//!         Ok::<_, BoxError>(format!("score for {key}").into_bytes())
//!     }),
//! );
//!
//! let view = group.get("alice").await?;
//! assert_eq!(view.to_string(), "score for alice");
//!
//! // The second read is a local cache hit; the loader is not consulted.
//! let again = group.get("alice").await?;
//! assert_eq!(again, view);
//! # Ok::<(), hivecache::Error>(())
//! # });
//! ```

mod error;
mod group;
mod peer;

pub use error::{BoxError, Error, Result};
pub use group::{Group, get_group, new_group};
#[doc(inline)]
pub use hivecache_store::{ByteView, ConcurrentCache};
pub use peer::{FetchRequest, FetchResponse, KeyLoader, LoaderFn, PeerPicker, RemotePeer};
