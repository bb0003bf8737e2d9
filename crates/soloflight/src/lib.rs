// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coalesces duplicate async loads into a single execution.
//!
//! [`Flight`] deduplicates concurrent work identified by a key. The first
//! caller for a key (the "leader") runs the supplied closure; callers that
//! arrive while that work is in flight (the "followers") wait and receive a
//! clone of the leader's result. The in-flight record is removed as soon as
//! the work completes, so a later call for the same key starts fresh work —
//! results are shared, never memoized.
//!
//! # Example
//!
//! ```
//! use soloflight::Flight;
//!
//! # futures::executor::block_on(async {
//! let flight: Flight<String, String> = Flight::new();
//!
//! // Concurrent calls with the same key share one execution.
//! let value = flight
//!     .work("user:42".to_string(), || async { "profile".to_string() })
//!     .await;
//! assert_eq!(value, "profile");
//! # });
//! ```
//!
//! # Cancellation
//!
//! Dropping the leader's future before it completes promotes one waiting
//! follower, which then runs its own closure. Receivers returned by
//! [`Flight::work_chan`] are closed without a value if every caller for the
//! key goes away before the work finishes.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicUsize, Ordering},
    },
};

use event_listener::Event;
use futures::channel::oneshot;
use parking_lot::Mutex;

type CallMap<K, T> = Arc<Mutex<HashMap<K, Weak<Call<T>>>>>;

/// A key space in which duplicate loads are suppressed.
///
/// At any moment there is at most one executing closure per key; every
/// caller coalesced onto that execution observes the same result.
pub struct Flight<K, T> {
    calls: CallMap<K, T>,
}

impl<K, T> Default for Flight<K, T> {
    fn default() -> Self {
        Self { calls: Arc::default() }
    }
}

impl<K, T> std::fmt::Debug for Flight<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flight").finish_non_exhaustive()
    }
}

/// One in-flight unit of work. Present in the call map only while the work
/// is executing; removed before waiters observe the result.
struct Call<T> {
    /// Written once by the completing leader, then read lock-free.
    result: OnceLock<T>,
    /// Wakes followers on completion, or wakes one for promotion when the
    /// leader is cancelled.
    done: Event,
    /// 1 while a leader is executing, otherwise 0.
    leaders: AtomicUsize,
    /// Channels handed out by `work_chan` while the work was in flight.
    subscribers: Mutex<Vec<oneshot::Sender<T>>>,
}

impl<T> Call<T> {
    fn new() -> Self {
        Self {
            result: OnceLock::new(),
            done: Event::new(),
            leaders: AtomicUsize::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> Call<T> {
    /// Delivers the stored result to every subscriber channel.
    fn fan_out(&self) {
        let value = self.result.get().expect("fan_out requires a stored result");
        for sender in self.subscribers.lock().drain(..) {
            // A dropped receiver is not an error.
            let _ = sender.send(value.clone());
        }
    }
}

/// RAII claim on a call's leader slot. Dropping an undisarmed guard (the
/// leader future was cancelled) releases the slot and wakes one follower so
/// it can take over.
struct LeaderGuard<T> {
    call: Option<Arc<Call<T>>>,
}

impl<T> LeaderGuard<T> {
    fn try_claim(call: &Arc<Call<T>>) -> Option<Self> {
        call.leaders
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            call: Some(Arc::clone(call)),
        })
    }

    /// Consumes the guard without releasing the slot; called once the
    /// result is stored and no promotion can be needed.
    fn disarm(mut self) {
        self.call.take();
    }
}

impl<T> Drop for LeaderGuard<T> {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            call.leaders.fetch_sub(1, Ordering::AcqRel);
            if call.result.get().is_none() {
                call.done.notify(1);
            }
        }
    }
}

enum Role<T> {
    Leader(LeaderGuard<T>),
    Follower,
}

impl<K, T> Flight<K, T>
where
    K: Hash + Eq + Clone,
    T: Clone,
{
    /// Creates an empty flight group.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `func` for the key, suppressing duplicates.
    ///
    /// If no work is in flight for the key the caller becomes the leader
    /// and executes `func`. Otherwise the caller waits for the in-flight
    /// execution and returns a clone of its result. The record is removed
    /// on completion, so a subsequent call re-executes.
    pub fn work<F, Fut>(&self, key: K, func: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let calls = Arc::clone(&self.calls);
        let (call, role) = {
            let mut map = calls.lock();
            match map.get(&key).and_then(Weak::upgrade) {
                Some(call) => {
                    // An abandoned record (every previous caller dropped
                    // mid-flight) has no leader; claim it if possible.
                    let role = match LeaderGuard::try_claim(&call) {
                        Some(guard) => Role::Leader(guard),
                        None => Role::Follower,
                    };
                    (call, role)
                }
                None => {
                    let call = Arc::new(Call::new());
                    map.insert(key.clone(), Arc::downgrade(&call));
                    let guard = LeaderGuard::try_claim(&call).expect("fresh call cannot have a leader");
                    (call, Role::Leader(guard))
                }
            }
        };
        async move {
            match role {
                Role::Leader(guard) => lead(&calls, &key, &call, func, guard).await,
                Role::Follower => follow(&calls, &key, &call, func).await,
            }
        }
    }

    /// Channel-delivering variant of [`work`](Self::work).
    ///
    /// If work for the key is already in flight, a subscriber channel is
    /// attached to it and returned immediately; nothing is executed. If
    /// not, `func` runs in the calling task and the result is delivered on
    /// the returned channel after the in-flight record has been removed
    /// and every subscriber notified. The channel is buffered, so the
    /// receiver can be awaited at leisure.
    pub async fn work_chan<F, Fut>(&self, key: K, func: F) -> oneshot::Receiver<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (sender, receiver) = oneshot::channel();
        let (call, guard) = {
            let mut map = self.calls.lock();
            match map.get(&key).and_then(Weak::upgrade) {
                Some(call) => {
                    // Subscribing under the map lock pairs with removal
                    // happening before fan-out: no subscriber can slip in
                    // after the result has been broadcast.
                    call.subscribers.lock().push(sender);
                    return receiver;
                }
                None => {
                    let call = Arc::new(Call::new());
                    let guard = LeaderGuard::try_claim(&call).expect("fresh call cannot have a leader");
                    map.insert(key.clone(), Arc::downgrade(&call));
                    (call, guard)
                }
            }
        };

        let value = func().await;
        let _ = call.result.set(value.clone());
        self.calls.lock().remove(&key);
        call.fan_out();
        call.done.notify(usize::MAX);
        guard.disarm();
        let _ = sender.send(value);
        receiver
    }
}

/// Executes the work as leader and publishes the result.
async fn lead<K, T, F, Fut>(calls: &Mutex<HashMap<K, Weak<Call<T>>>>, key: &K, call: &Arc<Call<T>>, func: F, guard: LeaderGuard<T>) -> T
where
    K: Hash + Eq,
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    // A promoted leader may find the result already published.
    if let Some(value) = call.result.get() {
        guard.disarm();
        return value.clone();
    }

    let value = func().await;

    if call.result.set(value.clone()).is_ok() {
        // Remove the record before waking anyone: the next caller for this
        // key must start fresh work rather than observe a stale record.
        calls.lock().remove(key);
        call.fan_out();
    }
    call.done.notify(usize::MAX);
    guard.disarm();

    // Every coalesced caller must observe the published result.
    call.result.get().cloned().unwrap_or(value)
}

/// Waits for the leader's result, taking over if the leader goes away.
async fn follow<K, T, F, Fut>(calls: &Mutex<HashMap<K, Weak<Call<T>>>>, key: &K, call: &Arc<Call<T>>, func: F) -> T
where
    K: Hash + Eq,
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    loop {
        if let Some(value) = call.result.get() {
            return value.clone();
        }

        // Register before re-checking so a completion cannot be missed.
        let listener = call.done.listen();

        if let Some(value) = call.result.get() {
            return value.clone();
        }

        if call.leaders.load(Ordering::Acquire) == 0 {
            if let Some(guard) = LeaderGuard::try_claim(call) {
                return lead(calls, key, call, func, guard).await;
            }
        }

        listener.await;
    }
}
