//! Execution strategies and run lifecycle
//!
//! The four strategies are the cross product of [`FanOut`] and [`Target`].
//! Declaration order is the order the harness runs them in when asked for
//! all of them.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// How outer iterations are spread over threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FanOut {
    /// One loop on the calling thread
    Serial,
    /// Independent units on the worker pool
    Parallel,
}

/// What the kernel accumulates into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// A private copy of the source value
    Plain,
    /// A handle derived inside a fresh store context
    Confined,
}

/// One cell of the {serial, parallel} x {plain, confined} matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serial loop over plain copies
    SerialPlain,
    /// Parallel fan-out over plain copies
    ParallelPlain,
    /// Serial loop, one confined context per iteration
    SerialConfined,
    /// Parallel fan-out, one confined context per unit
    ParallelConfined,
}

impl Strategy {
    /// All strategies, in run-all order
    pub const ALL: [Strategy; 4] = [
        Strategy::SerialPlain,
        Strategy::ParallelPlain,
        Strategy::SerialConfined,
        Strategy::ParallelConfined,
    ];

    /// Build a strategy from its two axes
    #[inline]
    #[must_use]
    pub const fn from_parts(fan_out: FanOut, target: Target) -> Self {
        match (fan_out, target) {
            (FanOut::Serial, Target::Plain) => Self::SerialPlain,
            (FanOut::Parallel, Target::Plain) => Self::ParallelPlain,
            (FanOut::Serial, Target::Confined) => Self::SerialConfined,
            (FanOut::Parallel, Target::Confined) => Self::ParallelConfined,
        }
    }

    /// Fan-out axis
    #[inline]
    #[must_use]
    pub const fn fan_out(self) -> FanOut {
        match self {
            Self::SerialPlain | Self::SerialConfined => FanOut::Serial,
            Self::ParallelPlain | Self::ParallelConfined => FanOut::Parallel,
        }
    }

    /// Target axis
    #[inline]
    #[must_use]
    pub const fn target(self) -> Target {
        match self {
            Self::SerialPlain | Self::ParallelPlain => Target::Plain,
            Self::SerialConfined | Self::ParallelConfined => Target::Confined,
        }
    }

    /// Stable machine name (CLI and JSON)
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SerialPlain => "serial-plain",
            Self::ParallelPlain => "parallel-plain",
            Self::SerialConfined => "serial-confined",
            Self::ParallelConfined => "parallel-confined",
        }
    }

    /// Human-readable label for reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SerialPlain => "Serial plain",
            Self::ParallelPlain => "Parallel plain",
            Self::SerialConfined => "Serial confined",
            Self::ParallelConfined => "Parallel confined",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown strategy name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown strategy '{0}' (expected one of serial-plain, parallel-plain, serial-confined, parallel-confined)")]
pub struct ParseStrategyError(pub String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == normalized)
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}

/// Lifecycle of one strategy run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    /// Never run
    NotStarted,
    /// Units are executing
    Running,
    /// Finished and published
    Completed,
    /// Aborted by an error; nothing published
    Failed,
    /// Aborted by cancellation; nothing published
    Cancelled,
}

impl RunState {
    /// States reachable from `self`
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [RunState] {
        match self {
            Self::NotStarted | Self::Completed | Self::Failed | Self::Cancelled => &[Self::Running],
            Self::Running => &[Self::Completed, Self::Failed, Self::Cancelled],
        }
    }

    /// Whether `self -> next` is a legal transition
    #[inline]
    #[must_use]
    pub fn can_transition_to(self, next: RunState) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// True once a run has ended, successfully or not
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}
