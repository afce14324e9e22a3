//! Configuration models for the pool and the vacate orchestrator.

pub mod pool;
pub mod vacate;

use thiserror::Error;

use crate::core::MultiError;

pub use crate::output::OutputFormat;
pub use pool::PoolConfig;
pub use vacate::VacateConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The input could not be parsed.
    #[error("config: parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// An environment variable holds a value of the wrong shape.
    #[error("config: invalid value {value:?} for {var}")]
    Env {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
    /// One or more values failed validation.
    #[error("config: invalid: {0}")]
    Invalid(MultiError),
}
