//! Tests for configuration loading and validation

use allocator_vacate::config::{ConfigError, OutputFormat, PoolConfig, VacateConfig};
use allocator_vacate::core::Timeout;
use allocator_vacate::output::OutputDevice;
use allocator_vacate::vacate::{
    AllocatorApi, AllocatorHealth, ApiError, MoveParams, MoveResponse, PlanActivity, ResourceKind,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

struct NoopApi;

#[async_trait]
impl AllocatorApi for NoopApi {
    async fn move_resources(&self, _params: MoveParams) -> Result<MoveResponse, ApiError> {
        Ok(MoveResponse::default())
    }

    async fn get_allocator(&self, _allocator_id: &str) -> Result<AllocatorHealth, ApiError> {
        Ok(AllocatorHealth::default())
    }

    async fn plan_activity(
        &self,
        resource_id: &str,
        _kind: ResourceKind,
    ) -> Result<PlanActivity, ApiError> {
        Err(ApiError::NotFound(resource_id.to_owned()))
    }
}

#[test]
fn test_pool_config_default_is_valid() {
    let cfg = PoolConfig::default();
    assert!(cfg.size >= 1);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.timeout(), Timeout::default());
}

#[test]
fn test_pool_config_invalid_size() {
    let cfg = PoolConfig::new().with_size(0);
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_pool_config_parse_error() {
    let err = PoolConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    assert!(err.to_string().starts_with("config: parse error"));
}

#[test]
fn test_pool_config_zero_timeout_from_json() {
    let err = PoolConfig::from_json_str(r#"{"size": 2, "stop_timeout_ms": 0}"#).unwrap_err();
    assert!(err.to_string().contains("stop_timeout_ms must be greater than 0"));
}

#[test]
fn test_vacate_config_requires_allocators_and_region() {
    let err = VacateConfig::default().validate().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("at least one allocator ID"));
    assert!(msg.contains("region not specified"));
}

#[test]
fn test_vacate_config_rejects_unknown_kind() {
    let err = VacateConfig::from_json_str(
        r#"{"allocators": ["i-1"], "region": "eu-west-1", "kind_filter": "redis"}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("invalid resource kind \"redis\""));
}

#[test]
fn test_vacate_config_into_params() {
    let cfg = VacateConfig::from_json_str(
        r#"{
            "allocators": ["i-1"],
            "region": "eu-west-1",
            "concurrency": 4,
            "add_timeout_ms": 5,
            "stop_timeout_ms": 2000,
            "track_frequency_ms": 250,
            "plan_overrides": {"skip_snapshot": true},
            "output_format": "json"
        }"#,
    )
    .unwrap();

    let (output, _buffer) = OutputDevice::buffer();
    let params = cfg.into_params(Arc::new(NoopApi), output);

    assert!(params.validate().is_ok());
    assert_eq!(params.concurrency, 4);
    assert_eq!(params.output_format, OutputFormat::Json);
    assert_eq!(params.track_frequency, Duration::from_millis(250));
    assert_eq!(
        params.pool_timeout,
        Timeout::new(Duration::from_millis(5), Duration::from_secs(2))
    );
    assert_eq!(params.plan_overrides.skip_snapshot, Some(true));
    assert!(params.interrupt.is_none());
}
