//! Moving a single resource off an allocator.

use std::fmt;

use tracing::{debug, info};

use super::api::{AllocatorApi, MoveParams, MoveRequest, ResourceMoveFailure, ResourceMoveRequest};
use super::error::VacateError;
use super::params::VacateClusterParams;
use super::track::{self, TrackParams};
use crate::core::{AppResult, MultiError};

/// Failures containing this phrase are a harmless race with a plan that is
/// already running, not a real error.
///
/// Matching on English API text is fragile; it is kept so behaviour matches
/// the control plane's current responses.
pub const PLAN_PENDING_MESSAGE: &str = "There is a plan still pending";

/// Lifecycle of a single resource move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VacateState {
    /// Listed by the allocator-wide dry run.
    Discovered,
    /// Move plan being recalculated for this resource only.
    Validating,
    /// Move submitted.
    Moving,
    /// Waiting for the deployment plan to finish.
    Tracking,
    /// Move finished.
    Completed,
    /// Move failed.
    Failed,
}

impl fmt::Display for VacateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovered => "discovered",
            Self::Validating => "validating",
            Self::Moving => "moving",
            Self::Tracking => "tracking",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Turn the failures that concern `resource` (or every resource when `None`)
/// into vacate errors, skipping plan-pending races.
pub(crate) fn move_failures(
    allocator_id: &str,
    failures: &[ResourceMoveFailure],
    resource: Option<&str>,
) -> MultiError {
    let mut merr = MultiError::new();
    for failure in failures {
        if resource.is_some_and(|id| id != failure.resource_id) {
            continue;
        }
        let messages: Vec<String> = failure
            .errors
            .iter()
            .filter(|detail| !detail.message.contains(PLAN_PENDING_MESSAGE))
            .map(|detail| format!("{} ({})", detail.message, detail.code))
            .collect();
        if messages.is_empty() && !failure.errors.is_empty() {
            debug!(
                allocator_id,
                resource_id = %failure.resource_id,
                "Ignoring plan pending failure"
            );
            continue;
        }
        let reason = if messages.is_empty() {
            "move rejected without details".to_owned()
        } else {
            messages.join("; ")
        };
        merr.push_error(
            VacateError::msg(allocator_id, &failure.resource_id, reason)
                .with_kind(failure.kind)
                .with_context("failed vacating"),
        );
    }
    merr
}

/// Move one resource and, unless skipped, track its plan to completion.
pub(crate) async fn vacate_cluster(item: &VacateClusterParams) -> AppResult<()> {
    let mut item = item.clone();
    let api = item
        .api
        .clone()
        .ok_or_else(|| anyhow::anyhow!("api reference is required for the operation"))?;
    let output = item
        .output
        .clone()
        .ok_or_else(|| anyhow::anyhow!("output device cannot be empty"))?;

    transition(&item, VacateState::Discovered);
    if item.allocator_down.is_none() {
        let health = api.get_allocator(&item.allocator_id).await.map_err(|e| {
            fail(&item);
            item_error(&item, e, "allocator health")
        })?;
        item.allocator_down = Some(health.is_down());
    }
    item.apply_defaults();

    transition(&item, VacateState::Validating);
    let request = scoped_request(&*api, &item).await.inspect_err(|_| fail(&item))?;

    transition(&item, VacateState::Moving);
    let response = api
        .move_resources(MoveParams {
            allocator_id: item.allocator_id.clone(),
            validate_only: false,
            allocator_down: item.allocator_down,
            move_only: item.move_only,
            body: request,
        })
        .await
        .map_err(|e| {
            fail(&item);
            item_error(&item, e, "failed vacating")
        })?;

    if let Err(merr) = move_failures(&item.allocator_id, &response.failures, Some(&item.resource_id))
        .into_result()
    {
        fail(&item);
        return Err(merr.into());
    }

    if item.skip_tracking {
        transition(&item, VacateState::Completed);
        return Ok(());
    }

    transition(&item, VacateState::Tracking);
    let result = track::track(&TrackParams {
        api: &*api,
        allocator_id: &item.allocator_id,
        resource_id: &item.resource_id,
        kind: item.kind,
        max_retries: item.max_poll_retries,
        frequency: item.track_frequency,
        output: &output,
        format: item.output_format,
    })
    .await;

    match &result {
        Ok(()) => transition(&item, VacateState::Completed),
        Err(_) => fail(&item),
    }
    result
}

/// Recalculate the move for this resource only and apply the overrides.
async fn scoped_request(
    api: &dyn AllocatorApi,
    item: &VacateClusterParams,
) -> AppResult<MoveRequest> {
    let dry_run = api
        .move_resources(MoveParams {
            allocator_id: item.allocator_id.clone(),
            validate_only: true,
            allocator_down: item.allocator_down,
            move_only: item.move_only,
            body: MoveRequest {
                resources: vec![ResourceMoveRequest {
                    resource_id: item.resource_id.clone(),
                    kind: item.kind,
                    plan_override: None,
                }],
            },
        })
        .await
        .map_err(|e| item_error(item, e, "failed calculating move"))?;

    let mut plan = dry_run
        .moves
        .into_iter()
        .find(|m| m.resource_id == item.resource_id && m.kind == item.kind)
        .map(|m| m.calculated_plan)
        .ok_or_else(|| {
            VacateError::msg(
                &item.allocator_id,
                &item.resource_id,
                "resource not found among the allocator's movable resources",
            )
            .with_kind(item.kind)
            .with_context("failed calculating move")
        })?;
    item.plan_overrides.apply(&mut plan);

    Ok(MoveRequest {
        resources: vec![ResourceMoveRequest {
            resource_id: item.resource_id.clone(),
            kind: item.kind,
            plan_override: Some(plan),
        }],
    })
}

fn item_error<E>(item: &VacateClusterParams, err: E, context: &str) -> anyhow::Error
where
    E: Into<anyhow::Error>,
{
    VacateError::new(&item.allocator_id, &item.resource_id, err)
        .with_kind(item.kind)
        .with_context(context)
        .into()
}

fn transition(item: &VacateClusterParams, state: VacateState) {
    debug!(
        allocator_id = %item.allocator_id,
        resource_id = %item.resource_id,
        kind = %item.kind,
        state = %state,
        "Resource vacate state"
    );
    if state == VacateState::Completed {
        info!(
            allocator_id = %item.allocator_id,
            resource_id = %item.resource_id,
            kind = %item.kind,
            "Resource vacated"
        );
    }
}

fn fail(item: &VacateClusterParams) {
    transition(item, VacateState::Failed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vacate::api::{FailureDetail, ResourceKind};

    fn failure(resource_id: &str, message: &str) -> ResourceMoveFailure {
        ResourceMoveFailure {
            resource_id: resource_id.into(),
            kind: ResourceKind::Elasticsearch,
            errors: vec![FailureDetail {
                code: "clusters.move_failed".into(),
                message: message.into(),
            }],
        }
    }

    #[test]
    fn test_move_failures_ignore_plan_pending() {
        let failures = vec![
            failure("abc", "There is a plan still pending, cancel that or wait for it to complete"),
            failure("def", "not enough capacity"),
        ];
        let merr = move_failures("i-1", &failures, None);
        assert_eq!(merr.len(), 1);
        assert_eq!(
            merr.to_string(),
            "1 error occurred:\n\t* allocator i-1: resource id [def][elasticsearch]: failed vacating: not enough capacity (clusters.move_failed)\n"
        );
    }

    #[test]
    fn test_move_failures_scoped_to_resource() {
        let failures = vec![failure("abc", "boom"), failure("def", "boom")];
        let merr = move_failures("i-1", &failures, Some("abc"));
        assert_eq!(merr.len(), 1);
        let vacate = merr.iter().next().and_then(|e| e.downcast_ref::<VacateError>());
        assert_eq!(vacate.map(|e| e.resource_id.as_str()), Some("abc"));
    }
}
