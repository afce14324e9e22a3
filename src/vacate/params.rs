//! Orchestrator configuration and per-resource work items.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use super::api::{AllocatorApi, CalculatedPlan, ResourceKind};
use crate::core::{AppResult, MultiError, Timeout, Validator};
use crate::output::{OutputDevice, OutputFormat};

/// Polling frequency applied when a work item has none.
pub const DEFAULT_TRACK_FREQUENCY: Duration = Duration::from_secs(10);

/// Poll retry budget applied when a work item has none.
pub const DEFAULT_MAX_POLL_RETRIES: u8 = 2;

/// Settings applied to every calculated move plan before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOverrides {
    /// Skip the snapshot taken before moving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_snapshot: Option<bool>,
    /// Skip migrating data off the vacated nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_data_migration: Option<bool>,
    /// Proceed even when failsafe checks object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_failsafe: Option<bool>,
    /// Allocators the resources should land on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_allocators: Vec<String>,
}

impl PlanOverrides {
    /// Apply every set override to `plan`.
    pub fn apply(&self, plan: &mut CalculatedPlan) {
        if let Some(skip) = self.skip_snapshot {
            plan.skip_snapshot = skip;
        }
        if let Some(skip) = self.skip_data_migration {
            plan.skip_data_migration = skip;
        }
        if let Some(force) = self.override_failsafe {
            plan.override_failsafe = force;
        }
        if !self.preferred_allocators.is_empty() {
            plan.preferred_allocators.clone_from(&self.preferred_allocators);
        }
    }
}

/// Parameters of a vacate run across one or more allocators.
#[derive(Clone, Default)]
pub struct VacateParams {
    /// Control-plane client.
    pub api: Option<Arc<dyn AllocatorApi>>,
    /// Allocators to vacate.
    pub allocators: Vec<String>,
    /// Only move these resource IDs.
    pub cluster_filter: Vec<String>,
    /// Only move resources of this kind.
    pub kind_filter: Option<String>,
    /// Treat the allocator as down without asking the health API.
    pub allocator_down: Option<bool>,
    /// Region the allocators belong to.
    pub region: String,
    /// Number of resources moved at once.
    pub concurrency: u16,
    /// Progress sink.
    pub output: Option<OutputDevice>,
    /// Progress format.
    pub output_format: OutputFormat,
    /// Poll retry budget while a plan is not yet visible.
    pub max_poll_retries: u8,
    /// Delay between plan polls.
    pub track_frequency: Duration,
    /// Return as soon as each move is accepted.
    pub skip_tracking: bool,
    /// Move instances without changing the plan.
    pub move_only: bool,
    /// Overrides applied to every move plan.
    pub plan_overrides: PlanOverrides,
    /// Pool add and stop timeouts.
    pub pool_timeout: Timeout,
    /// Cancellation source, see [`crate::util::signals::os_interrupt`].
    pub interrupt: Option<Receiver<()>>,
}

impl VacateParams {
    /// Check every parameter, reporting all defects at once.
    ///
    /// # Errors
    ///
    /// Returns one entry per invalid parameter.
    pub fn validate(&self) -> Result<(), MultiError> {
        let mut merr = MultiError::new();
        if self.api.is_none() {
            merr.push_msg("api reference is required for the operation");
        }
        if self.allocators.is_empty() {
            merr.push_msg("at least one allocator ID must be specified");
        }
        if self.allocators.iter().any(String::is_empty) {
            merr.push_msg("allocator IDs cannot be empty");
        }
        if self.concurrency == 0 {
            merr.push_msg("concurrency must be greater than 0");
        }
        if self.output.is_none() {
            merr.push_msg("output device cannot be empty");
        }
        if self.region.is_empty() {
            merr.push_msg("region not specified and is required for this operation");
        }
        if !self.cluster_filter.is_empty() && self.kind_filter.is_some() {
            merr.push_msg("only one of cluster filter or kind filter can be specified");
        }
        if let Some(kind) = &self.kind_filter {
            if let Err(e) = kind.parse::<ResourceKind>() {
                merr.push_error(e);
            }
        }
        if self.allocator_down.is_some() && self.allocators.len() > 1 {
            merr.push_msg("allocator down override cannot be set when vacating more than one allocator");
        }
        if self.pool_timeout.add.is_zero() || self.pool_timeout.stop.is_zero() {
            merr.push_msg("pool timeouts must be greater than 0");
        }
        merr.into_result()
    }

    /// Parsed kind filter. Only meaningful after [`VacateParams::validate`].
    pub(crate) fn kind(&self) -> Option<ResourceKind> {
        self.kind_filter.as_deref().and_then(|k| k.parse().ok())
    }
}

impl fmt::Debug for VacateParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VacateParams")
            .field("allocators", &self.allocators)
            .field("cluster_filter", &self.cluster_filter)
            .field("kind_filter", &self.kind_filter)
            .field("allocator_down", &self.allocator_down)
            .field("region", &self.region)
            .field("concurrency", &self.concurrency)
            .field("output_format", &self.output_format)
            .field("max_poll_retries", &self.max_poll_retries)
            .field("track_frequency", &self.track_frequency)
            .field("skip_tracking", &self.skip_tracking)
            .field("move_only", &self.move_only)
            .field("plan_overrides", &self.plan_overrides)
            .field("pool_timeout", &self.pool_timeout)
            .finish_non_exhaustive()
    }
}

/// Work item: move one resource off one allocator.
#[derive(Clone)]
pub struct VacateClusterParams {
    /// Control-plane client.
    pub api: Option<Arc<dyn AllocatorApi>>,
    /// Allocator being vacated.
    pub allocator_id: String,
    /// Resource to move.
    pub resource_id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Region the allocator belongs to.
    pub region: String,
    /// Whether the allocator is down; looked up when unset.
    pub allocator_down: Option<bool>,
    /// Poll retry budget; defaults when zero.
    pub max_poll_retries: u8,
    /// Delay between plan polls; defaults when zero.
    pub track_frequency: Duration,
    /// Return once the move is accepted.
    pub skip_tracking: bool,
    /// Move instances without changing the plan.
    pub move_only: bool,
    /// Overrides applied to the move plan.
    pub plan_overrides: PlanOverrides,
    /// Progress sink.
    pub output: Option<OutputDevice>,
    /// Progress format.
    pub output_format: OutputFormat,
}

impl VacateClusterParams {
    /// Fill poll defaults for unset values.
    pub(crate) fn apply_defaults(&mut self) {
        if self.max_poll_retries == 0 {
            self.max_poll_retries = DEFAULT_MAX_POLL_RETRIES;
        }
        if self.track_frequency.is_zero() {
            self.track_frequency = DEFAULT_TRACK_FREQUENCY;
        }
    }
}

impl Validator for VacateClusterParams {
    fn validate(&self) -> AppResult<()> {
        let mut merr = MultiError::new();
        if self.api.is_none() {
            merr.push_msg("api reference is required for the operation");
        }
        if self.allocator_id.is_empty() {
            merr.push_msg("allocator ID cannot be empty");
        }
        if self.resource_id.is_empty() {
            merr.push_msg("resource ID cannot be empty");
        }
        if self.region.is_empty() {
            merr.push_msg("region not specified and is required for this operation");
        }
        if self.output.is_none() {
            merr.push_msg("output device cannot be empty");
        }
        merr.into_result().map_err(anyhow::Error::new)
    }
}

impl fmt::Debug for VacateClusterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VacateClusterParams")
            .field("allocator_id", &self.allocator_id)
            .field("resource_id", &self.resource_id)
            .field("kind", &self.kind)
            .field("region", &self.region)
            .field("allocator_down", &self.allocator_down)
            .field("max_poll_retries", &self.max_poll_retries)
            .field("track_frequency", &self.track_frequency)
            .field("skip_tracking", &self.skip_tracking)
            .field("move_only", &self.move_only)
            .finish_non_exhaustive()
    }
}
