//! Atomic counter shared between the pool, its workers and the monitor.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free integer counter.
///
/// All operations use sequentially consistent ordering; the counters drive the
/// pool status machine and readers on other threads must observe writes in
/// program order.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a counter starting at `value`.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Overwrite the value.
    pub fn set(&self, value: u64) {
        self.0.store(value, Ordering::SeqCst);
    }

    /// Add `delta` and return the new value.
    pub fn add(&self, delta: u64) -> u64 {
        self.0.fetch_add(delta, Ordering::SeqCst) + delta
    }

    /// Subtract `delta`, saturating at zero, and return the new value.
    pub fn sub(&self, delta: u64) -> u64 {
        let previous = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some(v.saturating_sub(delta)))
            .unwrap_or_default();
        previous.saturating_sub(delta)
    }

    /// Store `new` only if the counter still holds `current`.
    ///
    /// Returns `true` when the swap happened.
    pub fn compare_exchange(&self, current: u64, new: u64) -> bool {
        self.0
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Apply `f` atomically; `f` returning `None` leaves the value untouched.
    ///
    /// Returns the previous value on success.
    pub fn update<F>(&self, f: F) -> Option<u64>
    where
        F: FnMut(u64) -> Option<u64>,
    {
        self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, f).ok()
    }
}
