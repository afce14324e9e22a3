//! Tests for the blocking runtime adapter

use allocator_vacate::runtime::BlockingRuntime;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_block_on_returns_future_output() {
    let runtime = BlockingRuntime::with_worker_threads(1).unwrap();
    let value = runtime.block_on(async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        42
    });
    assert_eq!(value, 42);
}

#[test]
fn test_shared_runtime_outlives_owner_thread() {
    let runtime = Arc::new(BlockingRuntime::with_worker_threads(2).unwrap());
    let worker = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || {
            runtime.block_on(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                "done"
            })
        })
    };
    drop(runtime);
    assert_eq!(worker.join().unwrap(), "done");
}

#[test]
fn test_zero_threads_is_clamped() {
    let runtime = BlockingRuntime::with_worker_threads(0).unwrap();
    assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
}
