//! Flat vacate configuration, loadable from JSON or `VACATE_*` variables.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::pool::millis;
use super::ConfigError;
use crate::core::{MultiError, Timeout, DEFAULT_ADD_TIMEOUT, DEFAULT_STOP_TIMEOUT};
use crate::output::{OutputDevice, OutputFormat};
use crate::vacate::{
    AllocatorApi, PlanOverrides, ResourceKind, VacateParams, DEFAULT_MAX_POLL_RETRIES,
    DEFAULT_TRACK_FREQUENCY,
};

/// The recognised vacate options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VacateConfig {
    /// Allocators to vacate.
    pub allocators: Vec<String>,
    /// Region the allocators belong to.
    pub region: String,
    /// Only move these resource IDs.
    pub cluster_filter: Vec<String>,
    /// Only move resources of this kind.
    pub kind_filter: Option<String>,
    /// Treat the allocator as down (single allocator only).
    pub allocator_down: Option<bool>,
    /// Number of resources moved at once.
    pub concurrency: u16,
    /// Pool enqueue timeout in milliseconds.
    pub add_timeout_ms: u64,
    /// Pool stop grace period in milliseconds.
    pub stop_timeout_ms: u64,
    /// Poll retry budget while a plan is not yet visible.
    pub max_poll_retries: u8,
    /// Delay between plan polls in milliseconds.
    pub track_frequency_ms: u64,
    /// Return as soon as each move is accepted.
    pub skip_tracking: bool,
    /// Move instances without changing the plan.
    pub move_only: bool,
    /// Overrides applied to every move plan.
    pub plan_overrides: PlanOverrides,
    /// Progress format.
    pub output_format: OutputFormat,
}

impl Default for VacateConfig {
    fn default() -> Self {
        Self {
            allocators: Vec::new(),
            region: String::new(),
            cluster_filter: Vec::new(),
            kind_filter: None,
            allocator_down: None,
            concurrency: 1,
            add_timeout_ms: millis(DEFAULT_ADD_TIMEOUT),
            stop_timeout_ms: millis(DEFAULT_STOP_TIMEOUT),
            max_poll_retries: DEFAULT_MAX_POLL_RETRIES,
            track_frequency_ms: millis(DEFAULT_TRACK_FREQUENCY),
            skip_tracking: false,
            move_only: false,
            plan_overrides: PlanOverrides::default(),
            output_format: OutputFormat::Text,
        }
    }
}

impl VacateConfig {
    /// Check the values that do not depend on runtime collaborators.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` listing every invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut merr = MultiError::new();
        if self.allocators.is_empty() {
            merr.push_msg("at least one allocator ID must be specified");
        }
        if self.region.is_empty() {
            merr.push_msg("region not specified and is required for this operation");
        }
        if self.concurrency == 0 {
            merr.push_msg("concurrency must be greater than 0");
        }
        if self.allocator_down.is_some() && self.allocators.len() > 1 {
            merr.push_msg(
                "allocator down override cannot be set when vacating more than one allocator",
            );
        }
        if !self.cluster_filter.is_empty() && self.kind_filter.is_some() {
            merr.push_msg("only one of cluster filter or kind filter can be specified");
        }
        if let Some(kind) = &self.kind_filter {
            if let Err(e) = kind.parse::<ResourceKind>() {
                merr.push_error(e);
            }
        }
        if self.add_timeout_ms == 0 || self.stop_timeout_ms == 0 {
            merr.push_msg("pool timeouts must be greater than 0");
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

    /// Load from the process environment, after reading `.env` if present.
    ///
    /// Recognised variables: `VACATE_ALLOCATORS`, `VACATE_REGION`,
    /// `VACATE_CLUSTERS`, `VACATE_KIND`, `VACATE_ALLOCATOR_DOWN`,
    /// `VACATE_CONCURRENCY`, `VACATE_ADD_TIMEOUT_MS`, `VACATE_STOP_TIMEOUT_MS`,
    /// `VACATE_MAX_POLL_RETRIES`, `VACATE_TRACK_FREQUENCY_MS`,
    /// `VACATE_SKIP_TRACKING`, `VACATE_MOVE_ONLY`, `VACATE_SKIP_SNAPSHOT`,
    /// `VACATE_SKIP_DATA_MIGRATION`, `VACATE_OVERRIDE_FAILSAFE`,
    /// `VACATE_TARGET_ALLOCATORS` and `VACATE_OUTPUT_FORMAT`. Lists are
    /// comma separated.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Env` for a malformed value, or
    /// `ConfigError::Invalid` when the result does not validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source, see [`VacateConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Same as [`VacateConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();
        let cfg = Self {
            allocators: env.list("VACATE_ALLOCATORS"),
            region: env.get("VACATE_REGION").unwrap_or_default(),
            cluster_filter: env.list("VACATE_CLUSTERS"),
            kind_filter: env.get("VACATE_KIND"),
            allocator_down: env.parse("VACATE_ALLOCATOR_DOWN")?,
            concurrency: env.parse("VACATE_CONCURRENCY")?.unwrap_or(defaults.concurrency),
            add_timeout_ms: env
                .parse("VACATE_ADD_TIMEOUT_MS")?
                .unwrap_or(defaults.add_timeout_ms),
            stop_timeout_ms: env
                .parse("VACATE_STOP_TIMEOUT_MS")?
                .unwrap_or(defaults.stop_timeout_ms),
            max_poll_retries: env
                .parse("VACATE_MAX_POLL_RETRIES")?
                .unwrap_or(defaults.max_poll_retries),
            track_frequency_ms: env
                .parse("VACATE_TRACK_FREQUENCY_MS")?
                .unwrap_or(defaults.track_frequency_ms),
            skip_tracking: env.parse("VACATE_SKIP_TRACKING")?.unwrap_or_default(),
            move_only: env.parse("VACATE_MOVE_ONLY")?.unwrap_or_default(),
            plan_overrides: PlanOverrides {
                skip_snapshot: env.parse("VACATE_SKIP_SNAPSHOT")?,
                skip_data_migration: env.parse("VACATE_SKIP_DATA_MIGRATION")?,
                override_failsafe: env.parse("VACATE_OVERRIDE_FAILSAFE")?,
                preferred_allocators: env.list("VACATE_TARGET_ALLOCATORS"),
            },
            output_format: env
                .parse("VACATE_OUTPUT_FORMAT")?
                .unwrap_or(defaults.output_format),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Orchestrator parameters for these settings.
    #[must_use]
    pub fn into_params(self, api: Arc<dyn AllocatorApi>, output: OutputDevice) -> VacateParams {
        VacateParams {
            api: Some(api),
            allocators: self.allocators,
            cluster_filter: self.cluster_filter,
            kind_filter: self.kind_filter,
            allocator_down: self.allocator_down,
            region: self.region,
            concurrency: self.concurrency,
            output: Some(output),
            output_format: self.output_format,
            max_poll_retries: self.max_poll_retries,
            track_frequency: Duration::from_millis(self.track_frequency_ms),
            skip_tracking: self.skip_tracking,
            move_only: self.move_only,
            plan_overrides: self.plan_overrides,
            pool_timeout: Timeout::new(
                Duration::from_millis(self.add_timeout_ms),
                Duration::from_millis(self.stop_timeout_ms),
            ),
            interrupt: None,
        }
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
    }

    fn list(&self, var: &str) -> Vec<String> {
        self.get(var)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse<T: std::str::FromStr>(&self, var: &str) -> Result<Option<T>, ConfigError> {
        self.get(var)
            .map(|value| {
                value.parse().map_err(|_| ConfigError::Env {
                    var: var.to_owned(),
                    value,
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_parses_lists_and_flags() {
        let cfg = VacateConfig::from_lookup(lookup(&[
            ("VACATE_ALLOCATORS", "i-1, i-2"),
            ("VACATE_REGION", "us-east-1"),
            ("VACATE_KIND", "kibana"),
            ("VACATE_CONCURRENCY", "8"),
            ("VACATE_SKIP_SNAPSHOT", "true"),
            ("VACATE_OUTPUT_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(cfg.allocators, vec!["i-1".to_string(), "i-2".to_string()]);
        assert_eq!(cfg.kind_filter.as_deref(), Some("kibana"));
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.plan_overrides.skip_snapshot, Some(true));
        assert_eq!(cfg.output_format, OutputFormat::Json);
        assert_eq!(cfg.max_poll_retries, DEFAULT_MAX_POLL_RETRIES);
    }

    #[test]
    fn test_from_lookup_rejects_malformed_number() {
        let err = VacateConfig::from_lookup(lookup(&[
            ("VACATE_ALLOCATORS", "i-1"),
            ("VACATE_REGION", "us-east-1"),
            ("VACATE_CONCURRENCY", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "VACATE_CONCURRENCY"));
    }

    #[test]
    fn test_allocator_down_needs_single_allocator() {
        let err = VacateConfig::from_lookup(lookup(&[
            ("VACATE_ALLOCATORS", "i-1,i-2"),
            ("VACATE_REGION", "us-east-1"),
            ("VACATE_ALLOCATOR_DOWN", "true"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("allocator down override"));
    }

    #[test]
    fn test_from_json_validates() {
        let err = VacateConfig::from_json_str(
            r#"{"allocators": ["i-1"], "region": "us-east-1", "cluster_filter": ["abc"], "kind_filter": "apm"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("only one of cluster filter or kind filter"));

        let cfg = VacateConfig::from_json_str(
            r#"{"allocators": ["i-1"], "region": "us-east-1", "output_format": "json"}"#,
        )
        .unwrap();
        assert_eq!(cfg.output_format, OutputFormat::Json);
        assert_eq!(cfg.concurrency, 1);
    }
}
