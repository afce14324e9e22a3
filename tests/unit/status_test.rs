//! Tests for the pool status values

use allocator_vacate::core::{Counter, PoolStatus};

#[test]
fn test_status_order_follows_lifecycle() {
    let order = [
        PoolStatus::Stopped,
        PoolStatus::Starting,
        PoolStatus::Started,
        PoolStatus::Idle,
        PoolStatus::Finished,
        PoolStatus::Stopping,
        PoolStatus::StoppedTimeout,
        PoolStatus::StoppedSuccess,
    ];
    for pair in order.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn test_stopping_and_stopped_predicates() {
    assert!(!PoolStatus::Finished.is_stopping());
    assert!(PoolStatus::Stopping.is_stopping());
    assert!(!PoolStatus::Stopping.is_stopped());
    assert!(PoolStatus::StoppedTimeout.is_stopped());
    assert!(PoolStatus::StoppedSuccess.is_stopped());
    assert!(!PoolStatus::Stopped.is_stopped());
}

#[test]
fn test_counter_saturates_and_swaps() {
    let counter = Counter::new(1);
    counter.sub(5);
    assert_eq!(counter.get(), 0);
    assert!(counter.compare_exchange(0, 3));
    assert!(!counter.compare_exchange(0, 4));
    assert_eq!(counter.get(), 3);
}
