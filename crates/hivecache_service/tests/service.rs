// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the service adapter and peer pool.
//!
//! Group names are unique per test because the registry is process-global.

use std::{
    collections::HashSet,
    sync::Arc,
};

use async_trait::async_trait;
use hivecache::{BoxError, Error, FetchRequest, FetchResponse, LoaderFn, PeerPicker, RemotePeer, new_group};
use hivecache_service::{DEFAULT_BASE_PATH, PeerPool, ServiceAdapter, decode_response, request_path};

fn echo_loader() -> LoaderFn<impl Fn(String) -> std::future::Ready<Result<Vec<u8>, BoxError>> + Send + Sync> {
    LoaderFn::new(|key: String| std::future::ready(Ok(format!("value:{key}").into_bytes())))
}

/// A peer stub that records which address it was built for.
struct StubPeer {
    addr: String,
}

#[async_trait]
impl RemotePeer for StubPeer {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, BoxError> {
        Ok(FetchResponse {
            value: format!("{}:{}", self.addr, request.key).into_bytes().into(),
        })
    }
}

#[tokio::test]
async fn adapter_serves_registered_groups() {
    new_group("svc-dispatch", 1024, echo_loader());

    let adapter = ServiceAdapter::new();
    let path = request_path(DEFAULT_BASE_PATH, "svc-dispatch", "k1");
    let frame = adapter.serve(&path).await.expect("request should be served");

    let value = decode_response(&frame).expect("frame should decode");
    assert_eq!(&value[..], b"value:k1");
}

#[tokio::test]
async fn adapter_rejects_unknown_groups() {
    let adapter = ServiceAdapter::new();
    let result = adapter.serve("/api/cache/svc-unregistered/k").await;
    assert!(matches!(result, Err(Error::GroupNotFound(name)) if name == "svc-unregistered"));
}

#[tokio::test]
async fn adapter_rejects_empty_keys() {
    new_group("svc-empty-key", 1024, echo_loader());

    let adapter = ServiceAdapter::new();
    let result = adapter.serve("/api/cache/svc-empty-key/").await;
    assert!(matches!(result, Err(Error::EmptyKey)));
}

#[tokio::test]
async fn adapter_rejects_foreign_paths() {
    let adapter = ServiceAdapter::new();
    assert!(matches!(adapter.serve("/healthz").await, Err(Error::BadPath(_))));
    assert!(matches!(adapter.serve("/api/cache/no-key").await, Err(Error::BadPath(_))));
}

#[tokio::test]
async fn adapter_honors_custom_base_paths() {
    new_group("svc-custom-base", 1024, echo_loader());

    let adapter = ServiceAdapter::with_base_path("/internal/cache/");
    let path = request_path(adapter.base_path(), "svc-custom-base", "k");
    let frame = adapter.serve(&path).await.expect("request should be served");
    assert_eq!(&decode_response(&frame).expect("frame should decode")[..], b"value:k");
}

#[test]
fn pool_never_picks_the_local_node() {
    let pool = PeerPool::new("http://10.0.0.1:8001");
    pool.set_peers(
        ["http://10.0.0.1:8001", "http://10.0.0.2:8001", "http://10.0.0.3:8001"],
        |addr| Arc::new(StubPeer { addr: addr.to_owned() }) as Arc<dyn RemotePeer>,
    );

    let mut remote_hits = 0;
    for i in 0..200 {
        let key = format!("key-{i}");
        match pool.pick(&key) {
            // Picks must be stable for a fixed membership.
            Some(peer) => {
                remote_hits += 1;
                let again = pool.pick(&key).expect("repeat pick should agree");
                assert!(Arc::ptr_eq(&peer, &again), "repeat pick must route to the same peer");
            }
            None => {
                assert!(pool.pick(&key).is_none(), "repeat pick should agree");
            }
        }
    }
    // With three equal peers, roughly two thirds of keys are remote.
    assert!(remote_hits > 0, "some keys must hash to remote peers");
}

#[test]
fn pool_with_no_membership_picks_nothing() {
    let pool = PeerPool::new("http://self");
    assert!(pool.pick("any-key").is_none());
}

#[test]
fn reconfiguration_replaces_the_membership() {
    let pool = PeerPool::new("http://self");
    pool.set_peers(
        ["http://self", "http://other"],
        |addr| Arc::new(StubPeer { addr: addr.to_owned() }) as Arc<dyn RemotePeer>,
    );

    // Shrink the cluster to just this node: every key becomes self-owned.
    pool.set_peers(
        ["http://self"],
        |addr| Arc::new(StubPeer { addr: addr.to_owned() }) as Arc<dyn RemotePeer>,
    );
    for i in 0..50 {
        assert!(pool.pick(&format!("key-{i}")).is_none());
    }
}

#[tokio::test]
async fn pool_routes_group_fetches_to_peers() {
    let pool = Arc::new(PeerPool::new("http://10.0.0.1:8001"));
    pool.set_peers(
        ["http://10.0.0.1:8001", "http://10.0.0.2:8001"],
        |addr| Arc::new(StubPeer { addr: addr.to_owned() }) as Arc<dyn RemotePeer>,
    );

    let group = new_group("svc-pool-routing", 1024, echo_loader());
    group.register_peers(Arc::clone(&pool) as Arc<dyn PeerPicker>);

    // Exercise enough keys to see both the remote and the self-owned path.
    let mut outcomes = HashSet::new();
    for i in 0..50 {
        let key = format!("key-{i}");
        let view = group.get(&key).await.expect("get should succeed");
        let text = view.to_string();
        if text.starts_with("http://10.0.0.2:8001:") {
            outcomes.insert("remote");
        } else {
            assert_eq!(text, format!("value:{key}"), "self-owned keys load from the origin");
            outcomes.insert("local");
        }
    }
    assert_eq!(outcomes.len(), 2, "both routing outcomes should occur across 50 keys");
}
