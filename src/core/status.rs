//! Pool lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a [`Pool`](crate::core::Pool).
///
/// The discriminants are ordered: every state at or above
/// [`PoolStatus::Stopping`] is terminal for automatic transitions.
///
/// ```text
/// Stopped -> Starting -> Started <-> Idle <-> Finished -> Stopping -> StoppedTimeout
///                                                                  \-> StoppedSuccess
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PoolStatus {
    /// Never started.
    Stopped = 0,
    /// Workers spawned, no work observed yet.
    Starting = 1,
    /// Work queued and not fully processed.
    Started = 2,
    /// Queue empty and every queued item processed.
    Idle = 3,
    /// A burst was fully drained while idle.
    Finished = 4,
    /// A stop was requested and is in progress.
    Stopping = 5,
    /// Stopped, at least one worker abandoned its item.
    StoppedTimeout = 6,
    /// Stopped, every worker exited cleanly.
    StoppedSuccess = 7,
}

impl PoolStatus {
    /// Whether a stop was requested or completed.
    #[must_use]
    pub fn is_stopping(self) -> bool {
        self >= Self::Stopping
    }

    /// Whether the pool completed a stop.
    #[must_use]
    pub fn is_stopped(self) -> bool {
        self >= Self::StoppedTimeout
    }

    pub(crate) const fn as_u64(self) -> u64 {
        self as u64
    }
}

impl From<u64> for PoolStatus {
    fn from(value: u64) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Started,
            3 => Self::Idle,
            4 => Self::Finished,
            5 => Self::Stopping,
            6 => Self::StoppedTimeout,
            7 => Self::StoppedSuccess,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Idle => "idle",
            Self::Finished => "finished",
            Self::Stopping => "stopping",
            Self::StoppedTimeout => "stopped (timeout)",
            Self::StoppedSuccess => "stopped (success)",
        };
        f.write_str(name)
    }
}
