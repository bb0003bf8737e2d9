// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Concurrent, byte-budgeted LRU storage for cache groups.
//!
//! This crate provides [`ConcurrentCache`], the single-node storage engine:
//! a recency list (oldest at the head, newest at the tail) paired with a
//! sharded key→entry map. Capacity is expressed in payload bytes; inserting
//! past the budget evicts from the head until the budget is met again.
//!
//! Values are stored as [`ByteView`], an immutable byte payload whose length
//! is its declared memory cost.
//!
//! # Examples
//!
//! ```
//! use hivecache_store::{ByteView, ConcurrentCache};
//!
//! let cache = ConcurrentCache::new(1024);
//! cache.add("greeting", ByteView::from("hello"));
//!
//! let view = cache.get("greeting").expect("entry should exist");
//! assert_eq!(view.to_vec(), b"hello");
//! assert_eq!(cache.used_bytes(), 5);
//! ```

mod cache;
mod entry;
mod list;
mod map;
mod view;

pub use cache::ConcurrentCache;
pub use view::ByteView;
