// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A miniature two-"node" cluster in one process.
//!
//! The peers here are plain in-process objects rather than HTTP clients;
//! the point is the routing: a key either hashes to the remote peer (and is
//! served by it) or is self-owned (and loads from the origin into the local
//! cache). A real deployment implements `RemotePeer` over its transport and
//! registers a `hivecache_service::PeerPool` instead of the stub picker.

use std::sync::Arc;

use hivecache::{BoxError, FetchRequest, FetchResponse, LoaderFn, PeerPicker, RemotePeer, new_group};

struct InProcessPeer;

#[async_trait::async_trait]
impl RemotePeer for InProcessPeer {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, BoxError> {
        Ok(FetchResponse {
            value: format!("remote copy of {}", request.key).into_bytes().into(),
        })
    }
}

/// Routes keys with an even length to the remote peer.
struct EvenKeysRemote;

impl PeerPicker for EvenKeysRemote {
    fn pick(&self, key: &str) -> Option<Arc<dyn RemotePeer>> {
        (key.len() % 2 == 0).then(|| Arc::new(InProcessPeer) as Arc<dyn RemotePeer>)
    }
}

#[tokio::main]
async fn main() {
    let group = new_group(
        "demo",
        64 * 1024,
        LoaderFn::new(|key: String| async move { Ok::<_, BoxError>(format!("origin copy of {key}").into_bytes()) }),
    );
    group.register_peers(Arc::new(EvenKeysRemote));

    for key in ["odd", "even", "self-owned-key-1"] {
        let view = group.get(key).await.expect("lookup failed");
        println!("{key}: {view}");
    }
    println!("locally cached entries: {}", group.cache_len());
}
