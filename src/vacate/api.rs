//! Control-plane capabilities the orchestrator drives, and their models.
//!
//! The REST transport is supplied by the caller through [`AllocatorApi`]; the
//! types here describe only the fields the orchestrator reads or writes.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of resource hosted on an allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Elasticsearch cluster.
    Elasticsearch,
    /// Kibana instance.
    Kibana,
    /// APM server.
    Apm,
    /// App Search instance.
    Appsearch,
    /// Enterprise Search instance.
    EnterpriseSearch,
}

impl ResourceKind {
    /// Every kind, in the order moves are processed.
    pub const ALL: [Self; 5] = [
        Self::Elasticsearch,
        Self::Kibana,
        Self::Apm,
        Self::Appsearch,
        Self::EnterpriseSearch,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elasticsearch => "elasticsearch",
            Self::Kibana => "kibana",
            Self::Apm => "apm",
            Self::Appsearch => "appsearch",
            Self::EnterpriseSearch => "enterprise_search",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ApiError::InvalidKind(s.to_owned()))
    }
}

/// Errors surfaced by the control-plane client.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The requested entity does not exist (yet).
    #[error("not found: {0}")]
    NotFound(String),
    /// The API answered with an error status.
    #[error("api error ({code}): {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Error message returned by the API.
        message: String,
    },
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// A resource kind outside the supported set.
    #[error("invalid resource kind \"{0}\"")]
    InvalidKind(String),
}

/// Plan settings computed by the API for a move, editable before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedPlan {
    /// Allocators the resource should be moved to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_allocators: Vec<String>,
    /// Skip the snapshot taken before the move.
    #[serde(default)]
    pub skip_snapshot: bool,
    /// Skip migrating data off the vacated nodes.
    #[serde(default)]
    pub skip_data_migration: bool,
    /// Proceed even when failsafe checks object.
    #[serde(default)]
    pub override_failsafe: bool,
    /// Remaining plan fields, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

/// One resource to move, optionally with an explicit plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMoveRequest {
    /// Resource identifier.
    pub resource_id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Plan to apply instead of the API-calculated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_override: Option<CalculatedPlan>,
}

/// Body of a move request. Empty means every resource on the allocator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Resources to move.
    #[serde(default)]
    pub resources: Vec<ResourceMoveRequest>,
}

/// Parameters of a single move call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveParams {
    /// Allocator being vacated.
    pub allocator_id: String,
    /// Only compute and validate the moves.
    pub validate_only: bool,
    /// Treat the allocator as unreachable.
    pub allocator_down: Option<bool>,
    /// Move instances without changing the plan.
    pub move_only: bool,
    /// Request body.
    pub body: MoveRequest,
}

/// A move the API can perform, with the plan it calculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMove {
    /// Resource identifier.
    pub resource_id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Calculated plan.
    #[serde(default)]
    pub calculated_plan: CalculatedPlan,
}

/// A single reason a move was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    /// Machine readable code.
    pub code: String,
    /// Human readable message.
    pub message: String,
}

/// A resource the API refused to move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMoveFailure {
    /// Resource identifier.
    pub resource_id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Every reason reported.
    #[serde(default)]
    pub errors: Vec<FailureDetail>,
}

/// Result of a move call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    /// Moves that can or did happen.
    #[serde(default)]
    pub moves: Vec<ResourceMove>,
    /// Moves that were rejected.
    #[serde(default)]
    pub failures: Vec<ResourceMoveFailure>,
}

/// Connectivity and health of an allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorHealth {
    /// The control plane can reach the allocator.
    pub connected: bool,
    /// The allocator reports itself healthy.
    pub healthy: bool,
}

impl AllocatorHealth {
    /// An allocator that is disconnected or unhealthy counts as down.
    #[must_use]
    pub const fn is_down(self) -> bool {
        !self.connected || !self.healthy
    }
}

/// Outcome of one plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Still running.
    Pending,
    /// Finished successfully.
    Success,
    /// Finished with a warning.
    Warning,
    /// Failed.
    Error,
}

/// One step of a plan's execution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Step identifier, e.g. `migrate-data`.
    pub step_id: String,
    /// Current status.
    pub status: StepStatus,
    /// Time spent in the step so far.
    #[serde(default)]
    pub duration_ms: u64,
    /// Error or info message attached to the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Execution log of one plan attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLog {
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

impl PlanLog {
    /// Total duration of the recorded steps.
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }

    /// The first failed step, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Error)
    }
}

/// Plan state of the deployment that owns a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanActivity {
    /// Owning deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    /// Plan currently being applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PlanLog>,
    /// Most recently applied plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<PlanLog>,
}

/// Operations the orchestrator needs from the control plane.
///
/// Implementations must be safe to call from many workers at once.
#[async_trait]
pub trait AllocatorApi: Send + Sync + 'static {
    /// Move (or, with `validate_only`, compute the moves of) resources off an allocator.
    async fn move_resources(&self, params: MoveParams) -> Result<MoveResponse, ApiError>;

    /// Fetch an allocator's connectivity and health.
    async fn get_allocator(&self, allocator_id: &str) -> Result<AllocatorHealth, ApiError>;

    /// Fetch the plan state of the deployment owning a resource.
    async fn plan_activity(
        &self,
        resource_id: &str,
        kind: ResourceKind,
    ) -> Result<PlanActivity, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_wire_names() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.to_string())
            );
        }
        assert!("redis".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_allocator_down_derivation() {
        let healthy = AllocatorHealth { connected: true, healthy: true };
        assert!(!healthy.is_down());
        assert!(AllocatorHealth { connected: false, healthy: true }.is_down());
        assert!(AllocatorHealth { connected: true, healthy: false }.is_down());
    }

    #[test]
    fn test_plan_log_failure_and_duration() {
        let log = PlanLog {
            steps: vec![
                PlanStep {
                    step_id: "snapshot".into(),
                    status: StepStatus::Success,
                    duration_ms: 1500,
                    message: None,
                },
                PlanStep {
                    step_id: "migrate-data".into(),
                    status: StepStatus::Error,
                    duration_ms: 500,
                    message: Some("disk full".into()),
                },
            ],
        };
        assert_eq!(log.duration_ms(), 2000);
        assert_eq!(log.failure().map(|s| s.step_id.as_str()), Some("migrate-data"));
    }
}
