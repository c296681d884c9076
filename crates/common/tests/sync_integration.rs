//! Integration tests for single-flight execution on the multi-threaded runtime
//!
//! Tests the public behavior callers rely on: one execution per pending
//! flight, a shared result, and a fresh flight once the previous one settled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use encore_common::{FlightRole, SingleFlight};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_callers_share_one_execution() {
    let flight = Arc::new(SingleFlight::<Result<u32, String>>::new());
    let executions = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let flight = Arc::clone(&flight);
            let executions = Arc::clone(&executions);
            tokio::spawn(async move {
                flight
                    .run(|| async move {
                        executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok(7)
                    })
                    .await
            })
        })
        .collect();

    let mut leaders = 0;
    for handle in handles {
        let (result, role) = handle.await.expect("task should not panic");
        assert_eq!(result, Ok(7));
        if role == FlightRole::Leader {
            leaders += 1;
        }
    }

    assert_eq!(executions.load(Ordering::SeqCst), 1);
    assert_eq!(leaders, 1);
    assert!(!flight.is_in_flight());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_are_shared_and_not_cached() {
    let flight = SingleFlight::<Result<(), String>>::new();

    let (first, role) = flight.run(|| async { Err("refresh rejected".to_string()) }).await;
    assert_eq!(first, Err("refresh rejected".to_string()));
    assert_eq!(role, FlightRole::Leader);

    let (second, role) = flight.run(|| async { Ok(()) }).await;
    assert_eq!(second, Ok(()));
    assert_eq!(role, FlightRole::Leader);
    assert_eq!(flight.generation(), 2);
}
