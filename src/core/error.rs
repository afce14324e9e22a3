//! Error types for pool operations.

use std::fmt;

use thiserror::Error;

use super::multierror::MultiError;

/// Errors produced by [`Pool`](crate::core::Pool) operations.
///
/// Only [`PoolError::InvalidParams`] is fatal. The timeout variants are
/// advisory: they signal partial progress that the caller is expected to
/// retry or accept.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// Construction parameters failed validation.
    #[error("pool: invalid parameters: {0}")]
    InvalidParams(MultiError),
    /// `start` was called on a pool that is running.
    #[error("pool: cannot start an already started pool")]
    AlreadyStarted,
    /// `stop` was called on a pool that is not running.
    #[error("pool: cannot stop an already stopped pool")]
    AlreadyStopped,
    /// Work was added after a stop was requested.
    #[error("pool: cannot add work to a stopping pool")]
    CannotAddWorkToStoppingPool,
    /// At least one item could not be enqueued within the add timeout.
    #[error("pool: failed adding work, the add operation timed out")]
    AddOperationTimedOut,
    /// At least one worker did not finish its item within the stop timeout.
    #[error("pool: the stop operation timed out, some work was abandoned")]
    StopOperationTimedOut,
    /// `start` was called after the interrupt source fired.
    #[error("pool: cannot start an interrupted pool")]
    Interrupted,
    /// `wait` was called on a pool that was never started.
    #[error("pool: cannot wait on a stopped pool")]
    CannotWaitOnStoppedPool,
    /// `leftovers` was called before the pool stopped.
    #[error("pool: cannot obtain leftovers on a pool that is not stopped")]
    CannotGetLeftovers,
    /// One or more work items failed.
    #[error("pool: {0}")]
    Work(MultiError),
    /// Internal failure (thread spawn, worker panic, channel closed).
    #[error("pool: internal error: {0}")]
    Internal(String),
}

/// Items that `add` could not enqueue, returned so the caller keeps ownership.
#[derive(Error)]
#[error("{reason} ({} item(s) not enqueued)", .items.len())]
pub struct AddError<T> {
    /// Why the items were not enqueued.
    pub reason: PoolError,
    /// The un-enqueued items, in submission order.
    pub items: Vec<T>,
}

impl<T> AddError<T> {
    /// Take back the un-enqueued items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> fmt::Debug for AddError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddError")
            .field("reason", &self.reason)
            .field("items", &self.items.len())
            .finish()
    }
}

/// Application-facing result using anyhow for work item outcomes.
pub type AppResult<T> = Result<T, anyhow::Error>;
