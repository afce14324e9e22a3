//! Telemetry helpers for structured logging.

/// Install a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`.
///
/// Does nothing when a global subscriber is already set, so callers may
/// install their own first.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_names(true)
        .try_init();
}
