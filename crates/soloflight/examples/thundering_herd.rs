// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates coalescing a thundering herd onto one execution.
//!
//! Ten tasks ask for the same key at once; the first becomes the leader and
//! does the slow work, the other nine wait and share its result.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use soloflight::Flight;

#[tokio::main]
async fn main() {
    let flight = Arc::new(Flight::<String, String>::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for i in 1..=10 {
        let flight = Arc::clone(&flight);
        let executions = Arc::clone(&executions);
        handles.push(tokio::spawn(async move {
            let value = flight
                .work("report:today".to_string(), || async move {
                    executions.fetch_add(1, Ordering::SeqCst);
                    println!("  [task {i}] leading: building the report…");
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    "report contents".to_string()
                })
                .await;
            println!("  [task {i}] got: {value}");
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }

    println!("executions: {}", executions.load(Ordering::SeqCst));
}
