//! Pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::{MultiError, PoolParams, RunFn, Timeout, DEFAULT_ADD_TIMEOUT, DEFAULT_STOP_TIMEOUT};

/// Serializable pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of workers.
    pub size: usize,
    /// Per-item enqueue timeout in milliseconds.
    pub add_timeout_ms: u64,
    /// Grace period for in-flight work on stop, in milliseconds.
    pub stop_timeout_ms: u64,
    /// Stop the pool on the first failed item.
    pub fail_fast: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: num_cpus::get().max(1),
            add_timeout_ms: millis(DEFAULT_ADD_TIMEOUT),
            stop_timeout_ms: millis(DEFAULT_STOP_TIMEOUT),
            fail_fast: false,
        }
    }
}

impl PoolConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers.
    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set the enqueue timeout.
    #[must_use]
    pub fn with_add_timeout(mut self, timeout: Duration) -> Self {
        self.add_timeout_ms = millis(timeout);
        self
    }

    /// Set the stop grace period.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = millis(timeout);
        self
    }

    /// Enable or disable fail-fast.
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Check every value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` listing every invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut merr = MultiError::new();
        if self.size == 0 {
            merr.push_msg("size must be greater than 0");
        }
        if self.add_timeout_ms == 0 {
            merr.push_msg("add_timeout_ms must be greater than 0");
        }
        if self.stop_timeout_ms == 0 {
            merr.push_msg("stop_timeout_ms must be greater than 0");
        }
        merr.into_result().map_err(ConfigError::Invalid)
    }

    /// Parse from JSON and validate. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Add and stop timeouts.
    #[must_use]
    pub const fn timeout(&self) -> Timeout {
        Timeout::new(
            Duration::from_millis(self.add_timeout_ms),
            Duration::from_millis(self.stop_timeout_ms),
        )
    }

    /// Pool parameters running `run` with these settings.
    #[must_use]
    pub fn to_params<T>(&self, run: RunFn<T>) -> PoolParams<T> {
        PoolParams::new(self.size, run)
            .with_timeout(self.timeout())
            .with_fail_fast(self.fail_fast)
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_fills_defaults() {
        let cfg = PoolConfig::from_json_str(r#"{"size": 4, "fail_fast": true}"#).unwrap();
        assert_eq!(cfg.size, 4);
        assert!(cfg.fail_fast);
        assert_eq!(cfg.timeout(), Timeout::default());
    }

    #[test]
    fn test_validate_lists_every_defect() {
        let cfg = PoolConfig {
            size: 0,
            add_timeout_ms: 0,
            stop_timeout_ms: 0,
            fail_fast: false,
        };
        match cfg.validate() {
            Err(ConfigError::Invalid(merr)) => assert_eq!(merr.len(), 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_builder_setters() {
        let cfg = PoolConfig::new()
            .with_size(2)
            .with_add_timeout(Duration::from_millis(5))
            .with_stop_timeout(Duration::from_secs(1));
        assert_eq!(cfg.add_timeout_ms, 5);
        assert_eq!(cfg.stop_timeout_ms, 1000);
        let params = cfg.to_params::<u8>(std::sync::Arc::new(|_: &u8| Ok(())));
        assert!(params.validate().is_ok());
    }
}
