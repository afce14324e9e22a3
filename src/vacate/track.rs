//! Plan tracking: poll a deployment's plan until the move settles.
//!
//! Each poll is classified into a [`PollOutcome`]. `NotYetVisible` and
//! transient API errors consume the retry budget; a pending plan resets it.
//! A plan that completes with a failed step is reported as a [`VacateError`].

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::api::{AllocatorApi, ApiError, PlanActivity, PlanLog, PlanStep, ResourceKind, StepStatus};
use super::error::VacateError;
use crate::core::AppResult;
use crate::output::{OutputDevice, OutputFormat};

const TRACK_CONTEXT: &str = "plan tracking";

/// Classification of one plan poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A plan is being applied.
    Pending(PlanLog),
    /// The plan observed pending has finished; carries its final log.
    Completed(PlanLog),
    /// No pending plan has been observed yet.
    NotYetVisible,
}

impl PollOutcome {
    /// Classify `activity` given whether a pending plan was already observed.
    #[must_use]
    pub fn from_activity(activity: PlanActivity, seen_pending: bool) -> Self {
        match (activity.pending, seen_pending) {
            (Some(log), _) => Self::Pending(log),
            (None, true) => Self::Completed(activity.current.unwrap_or_default()),
            (None, false) => Self::NotYetVisible,
        }
    }
}

/// Inputs of a tracking run.
pub(crate) struct TrackParams<'a> {
    pub api: &'a dyn AllocatorApi,
    pub allocator_id: &'a str,
    pub resource_id: &'a str,
    pub kind: ResourceKind,
    pub max_retries: u8,
    pub frequency: Duration,
    pub output: &'a OutputDevice,
    pub format: OutputFormat,
}

/// A progress record in JSON output.
#[derive(Debug, Serialize)]
struct TrackRecord<'a> {
    deployment_id: &'a str,
    resource_id: &'a str,
    kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<StepStatus>,
    duration_ms: u64,
    finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Streams progress for one resource. Lines are written in observation order.
struct Reporter<'a> {
    params: &'a TrackParams<'a>,
    deployment_id: String,
    reported: usize,
}

impl<'a> Reporter<'a> {
    fn new(params: &'a TrackParams<'a>) -> Self {
        Self {
            params,
            deployment_id: params.resource_id.to_owned(),
            reported: 0,
        }
    }

    fn prefix(&self) -> String {
        format!(
            "Deployment [{}] - [{}][{}]",
            self.deployment_id, self.params.kind, self.params.resource_id
        )
    }

    /// Report the steps of `log` not reported yet.
    fn steps(&mut self, log: &PlanLog) {
        let mut elapsed: u64 = log.steps.iter().take(self.reported).map(|s| s.duration_ms).sum();
        for step in log.steps.iter().skip(self.reported) {
            elapsed += step.duration_ms;
            self.step(step, elapsed);
        }
        self.reported = self.reported.max(log.steps.len());
    }

    fn step(&self, step: &PlanStep, elapsed_ms: u64) {
        match self.params.format {
            OutputFormat::Text => self.line(&format!(
                "{}: running step \"{}\" (Plan duration {})...",
                self.prefix(),
                step.step_id,
                format_duration(elapsed_ms)
            )),
            OutputFormat::Json => self.json(&TrackRecord {
                deployment_id: &self.deployment_id,
                resource_id: self.params.resource_id,
                kind: self.params.kind,
                step_id: Some(&step.step_id),
                status: Some(step.status),
                duration_ms: elapsed_ms,
                finished: false,
                error: None,
            }),
        }
    }

    fn finished(&self, log: &PlanLog, error: Option<&str>) {
        let total = log.duration_ms();
        match self.params.format {
            OutputFormat::Text => {
                let line = match error {
                    None => format!(
                        "{}: finished running all the plan steps (Total plan duration: {})",
                        self.prefix(),
                        format_duration(total)
                    ),
                    Some(error) => format!(
                        "{}: caught error: \"{}\" (Total plan duration: {})",
                        self.prefix(),
                        error,
                        format_duration(total)
                    ),
                };
                self.line(&line);
            }
            OutputFormat::Json => self.json(&TrackRecord {
                deployment_id: &self.deployment_id,
                resource_id: self.params.resource_id,
                kind: self.params.kind,
                step_id: None,
                status: None,
                duration_ms: total,
                finished: true,
                error,
            }),
        }
    }

    fn line(&self, line: &str) {
        if let Err(e) = self.params.output.write_line(line) {
            warn!(error = %e, resource_id = self.params.resource_id, "Failed writing progress");
        }
    }

    fn json(&self, record: &TrackRecord<'_>) {
        if let Err(e) = self.params.output.write_json(record) {
            warn!(error = %e, resource_id = self.params.resource_id, "Failed writing progress");
        }
    }
}

/// Poll until the plan completes, fails, or the retry budget runs out.
pub(crate) async fn track(params: &TrackParams<'_>) -> AppResult<()> {
    let mut reporter = Reporter::new(params);
    let mut seen_pending = false;
    let mut retries: u8 = 0;

    loop {
        let outcome = match params.api.plan_activity(params.resource_id, params.kind).await {
            Ok(activity) => {
                if let Some(id) = activity.deployment_id.as_deref() {
                    id.clone_into(&mut reporter.deployment_id);
                }
                PollOutcome::from_activity(activity, seen_pending)
            }
            Err(ApiError::NotFound(_)) if !seen_pending => PollOutcome::NotYetVisible,
            Err(err) => {
                retries = retries.saturating_add(1);
                if retries > params.max_retries {
                    return Err(tracking_error(params, err).into());
                }
                debug!(resource_id = params.resource_id, retries, error = %err, "Plan poll failed, retrying");
                tokio::time::sleep(params.frequency).await;
                continue;
            }
        };

        match outcome {
            PollOutcome::NotYetVisible => {
                retries = retries.saturating_add(1);
                if retries > params.max_retries {
                    return Err(tracking_error(
                        params,
                        anyhow::anyhow!("no pending plan observed after {retries} attempts"),
                    )
                    .into());
                }
                debug!(resource_id = params.resource_id, retries, "Plan not visible yet");
            }
            PollOutcome::Pending(log) => {
                seen_pending = true;
                retries = 0;
                reporter.steps(&log);
            }
            PollOutcome::Completed(log) => {
                reporter.steps(&log);
                return match log.failure() {
                    None => {
                        reporter.finished(&log, None);
                        Ok(())
                    }
                    Some(step) => {
                        let message = step
                            .message
                            .clone()
                            .unwrap_or_else(|| format!("step \"{}\" failed", step.step_id));
                        reporter.finished(&log, Some(&message));
                        Err(tracking_error(params, anyhow::anyhow!(message)).into())
                    }
                };
            }
        }

        tokio::time::sleep(params.frequency).await;
    }
}

fn tracking_error<E>(params: &TrackParams<'_>, err: E) -> VacateError
where
    E: Into<anyhow::Error>,
{
    VacateError::new(params.allocator_id, params.resource_id, err)
        .with_kind(params.kind)
        .with_context(TRACK_CONTEXT)
}

fn format_duration(ms: u64) -> String {
    format!("{:?}", Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(steps: &[(&str, StepStatus)]) -> PlanLog {
        PlanLog {
            steps: steps
                .iter()
                .map(|(id, status)| PlanStep {
                    step_id: (*id).to_owned(),
                    status: *status,
                    duration_ms: 100,
                    message: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_outcome_pending_wins() {
        let activity = PlanActivity {
            deployment_id: None,
            pending: Some(log(&[("snapshot", StepStatus::Pending)])),
            current: Some(PlanLog::default()),
        };
        assert!(matches!(
            PollOutcome::from_activity(activity, false),
            PollOutcome::Pending(_)
        ));
    }

    #[test]
    fn test_outcome_not_visible_until_pending_seen() {
        let activity = PlanActivity {
            deployment_id: None,
            pending: None,
            current: Some(log(&[("snapshot", StepStatus::Success)])),
        };
        assert_eq!(
            PollOutcome::from_activity(activity.clone(), false),
            PollOutcome::NotYetVisible
        );
        assert_eq!(
            PollOutcome::from_activity(activity, true),
            PollOutcome::Completed(log(&[("snapshot", StepStatus::Success)]))
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(20), "20ms");
    }
}
