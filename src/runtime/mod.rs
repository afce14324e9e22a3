//! Tokio runtime used to drive async control-plane calls from pool threads.

pub mod blocking;

pub use blocking::BlockingRuntime;
