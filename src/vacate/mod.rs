//! Allocator vacate orchestration.
//!
//! [`vacate`] drains every movable resource off one or more allocators:
//!
//! 1. A dry-run move per allocator lists the candidate resources. Failures
//!    reported here are recorded and processing continues.
//! 2. One [`VacateClusterParams`] work item is built per candidate that passes
//!    the resource ID or kind filter, and submitted to a [`Pool`].
//! 3. Each worker recalculates the move for its resource, submits it and
//!    tracks the deployment plan until it settles.
//! 4. Once the pool drains it is stopped, and every error from every phase
//!    is returned as one flat [`MultiError`]. Items that never ran are
//!    reported as not processed.

pub mod api;
pub mod cluster;
pub mod error;
pub mod params;
pub mod track;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

pub use api::{
    AllocatorApi, AllocatorHealth, ApiError, CalculatedPlan, FailureDetail, MoveParams,
    MoveRequest, MoveResponse, PlanActivity, PlanLog, PlanStep, ResourceKind, ResourceMove,
    ResourceMoveFailure, ResourceMoveRequest, StepStatus,
};
pub use cluster::{VacateState, PLAN_PENDING_MESSAGE};
pub use error::VacateError;
pub use params::{
    PlanOverrides, VacateClusterParams, VacateParams, DEFAULT_MAX_POLL_RETRIES,
    DEFAULT_TRACK_FREQUENCY,
};
pub use track::PollOutcome;

use crate::core::{MultiError, Pool, PoolError, PoolParams, RunFn};
use crate::runtime::BlockingRuntime;

/// Reported for every item left unprocessed when the pool stops.
pub const NOT_PROCESSED_MESSAGE: &str = "cancelled or not processed, follow up accordingly";

const STOPPED_POLL: Duration = Duration::from_millis(1);

/// Vacate every allocator in `params`.
///
/// All resources are attempted before returning; per-resource failures do
/// not abort their siblings.
///
/// # Errors
///
/// Returns the validation errors when `params` is invalid, otherwise every
/// discovery, move, tracking and leftover error, flattened.
pub fn vacate(params: VacateParams) -> Result<(), MultiError> {
    params.validate()?;
    let (Some(api), Some(output)) = (params.api.clone(), params.output.clone()) else {
        return Err(MultiError::from(anyhow::anyhow!(
            "api reference and output device are required"
        )));
    };

    let concurrency = usize::from(params.concurrency);
    let runtime = BlockingRuntime::with_worker_threads(concurrency)
        .map(Arc::new)
        .map_err(|e| MultiError::from(anyhow::anyhow!("failed to build runtime: {e}")))?;

    // Abandoned items keep the runtime alive until their thread finishes.
    let shared = Arc::clone(&runtime);
    let run: RunFn<VacateClusterParams> =
        Arc::new(move |item: &VacateClusterParams| shared.block_on(cluster::vacate_cluster(item)));
    let mut pool_params = PoolParams::new(concurrency, run)
        .with_timeout(params.pool_timeout)
        .with_writer(output);
    if let Some(interrupt) = params.interrupt.clone() {
        pool_params = pool_params.with_interrupt(interrupt);
    }
    let pool = Pool::new(pool_params).map_err(flatten_pool_error)?;

    info!(
        allocators = params.allocators.len(),
        concurrency,
        region = %params.region,
        "Vacating allocators"
    );

    let mut merr = MultiError::new();
    let mut pending = Vec::new();
    for allocator_id in &params.allocators {
        let items = runtime.block_on(discover(&*api, &params, allocator_id, &mut merr));
        debug!(allocator_id = %allocator_id, resources = items.len(), "Moves discovered");
        if let Err(rejected) = pool.add(items) {
            pending.extend(rejected.into_items());
        }
    }

    let started = !pool.status().is_stopping() && match pool.start() {
        Ok(()) => true,
        Err(PoolError::Interrupted) => false,
        Err(_) if pool.status().is_stopping() => false,
        Err(e) => {
            merr.push_error(e);
            return merr.into_result();
        }
    };
    if started {
        resubmit(&pool, pending, &mut merr);
        match pool.wait() {
            Ok(()) | Err(PoolError::Work(_)) => {}
            Err(e) => merr.push_error(e),
        }
    } else {
        warn!("Pool stopped before it started, skipping the moves");
        for item in &pending {
            merr.push_error(not_processed(item));
        }
    }

    match pool.stop() {
        Ok(()) | Err(PoolError::StopOperationTimedOut) => {}
        Err(PoolError::AlreadyStopped) => {
            // An interrupt stops the pool from its own thread.
            while !pool.status().is_stopped() {
                thread::sleep(STOPPED_POLL);
            }
        }
        Err(e) => merr.push_error(e),
    }

    if let Err(PoolError::Work(work)) = pool.result() {
        merr.extend(work);
    }

    match pool.leftovers() {
        Ok(leftovers) => {
            if !leftovers.is_empty() {
                warn!(count = leftovers.len(), "Resources left unprocessed");
            }
            for item in &leftovers {
                merr.push_error(not_processed(item));
            }
        }
        Err(e) => merr.push_error(e),
    }

    info!(errors = merr.len(), "Vacate finished");
    merr.into_result()
}

/// Keep submitting the items `add` handed back until the pool takes them or
/// starts stopping.
fn resubmit(pool: &Pool<VacateClusterParams>, mut pending: Vec<VacateClusterParams>, merr: &mut MultiError) {
    while !pending.is_empty() {
        match pool.add(std::mem::take(&mut pending)) {
            Ok(()) => {}
            Err(rejected) if matches!(rejected.reason, PoolError::AddOperationTimedOut) => {
                pending = rejected.into_items();
            }
            Err(rejected) => {
                warn!(error = %rejected.reason, "Pool stopped before all work was enqueued");
                for item in rejected.into_items() {
                    merr.push_error(not_processed(&item));
                }
            }
        }
    }
}

/// Dry-run the move of everything on `allocator_id` and build the work items
/// that pass the filters. Failures are appended to `merr`.
async fn discover(
    api: &dyn AllocatorApi,
    params: &VacateParams,
    allocator_id: &str,
    merr: &mut MultiError,
) -> Vec<VacateClusterParams> {
    let response = match api
        .move_resources(MoveParams {
            allocator_id: allocator_id.to_owned(),
            validate_only: true,
            allocator_down: params.allocator_down,
            move_only: params.move_only,
            body: MoveRequest::default(),
        })
        .await
    {
        Ok(response) => response,
        Err(e) => {
            merr.push_error(
                VacateError::new(allocator_id, "", e).with_context("failed calculating moves"),
            );
            return Vec::new();
        }
    };

    let kind = params.kind();
    let selected = |resource_id: &str, resource_kind: ResourceKind| {
        if !params.cluster_filter.is_empty() {
            return params.cluster_filter.iter().any(|id| id == resource_id);
        }
        kind.is_none_or(|k| k == resource_kind)
    };

    let failures: Vec<ResourceMoveFailure> = response
        .failures
        .into_iter()
        .filter(|f| selected(&f.resource_id, f.kind))
        .collect();
    merr.extend(cluster::move_failures(allocator_id, &failures, None));

    response
        .moves
        .into_iter()
        .filter(|m| selected(&m.resource_id, m.kind))
        .map(|m| VacateClusterParams {
            api: params.api.clone(),
            allocator_id: allocator_id.to_owned(),
            resource_id: m.resource_id,
            kind: m.kind,
            region: params.region.clone(),
            allocator_down: params.allocator_down,
            max_poll_retries: params.max_poll_retries,
            track_frequency: params.track_frequency,
            skip_tracking: params.skip_tracking,
            move_only: params.move_only,
            plan_overrides: params.plan_overrides.clone(),
            output: params.output.clone(),
            output_format: params.output_format,
        })
        .collect()
}

fn not_processed(item: &VacateClusterParams) -> VacateError {
    VacateError::msg(&item.allocator_id, &item.resource_id, NOT_PROCESSED_MESSAGE).with_kind(item.kind)
}

fn flatten_pool_error(err: PoolError) -> MultiError {
    match err {
        PoolError::InvalidParams(merr) | PoolError::Work(merr) => merr,
        other => MultiError::from(anyhow::Error::new(other)),
    }
}
