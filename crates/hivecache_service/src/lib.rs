// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The transport-facing half of a hivecache node, minus the sockets.
//!
//! A peer-facing binding needs three things, all provided here:
//!
//! - a **path codec** mapping `{group, key}` onto `<base>/<group>/<key>`
//!   with percent-escaped components, and back ([`request_path`],
//!   [`parse_path`]);
//! - a **response codec** framing a value as a length-prefixed byte
//!   message ([`encode_response`], [`decode_response`]);
//! - a **dispatcher** resolving a parsed request against the group
//!   registry ([`ServiceAdapter`]);
//!
//! plus [`PeerPool`], which implements [`hivecache::PeerPicker`] over a
//! consistent-hash ring of peer addresses, excluding the node itself.
//!
//! The embedder supplies the actual HTTP (or other) server and client and
//! wires them to these pieces.

mod adapter;
mod codec;
mod pool;

pub use adapter::ServiceAdapter;
pub use codec::{DEFAULT_BASE_PATH, decode_response, encode_response, parse_path, request_path};
pub use pool::PeerPool;
