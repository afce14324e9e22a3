//! Tests for utility functions

use allocator_vacate::util::init_tracing;

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(component = "util_test", "Tracing initialised");
}

#[test]
fn test_os_interrupt_starts_quiet() {
    let rx = allocator_vacate::util::os_interrupt().unwrap();
    assert!(rx.try_recv().is_err());
}
