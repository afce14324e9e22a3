//! Shared utilities.

pub mod signals;
pub mod telemetry;

pub use signals::os_interrupt;
pub use telemetry::init_tracing;
