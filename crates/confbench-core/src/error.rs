//! Error types for the benchmark harness
//!
//! Every error is fatal to the run that produced it: nothing is retried and
//! nothing is published for a failed run. None of them terminate the
//! process.

use crate::strategy::Strategy;
use confbench_store::{ObjectId, StoreError};

/// Run-level harness error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BenchError {
    /// A confined handle could not be derived or resolved in the target context
    #[error("confinement violation{}: {reason}", object_suffix(.object))]
    ConfinementViolation {
        /// Object that could not be reached, when known
        object: Option<ObjectId>,
        /// What went wrong
        reason: String,
    },

    /// The persistence collaborator could not produce a work item
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The run was cancelled before all units completed
    #[error("{strategy} cancelled after {completed}/{total} units")]
    Cancelled {
        /// Strategy that was running
        strategy: Strategy,
        /// Units that finished before cancellation was observed
        completed: u64,
        /// Units the run was asked to execute
        total: u64,
    },

    /// The strategy already has a run in flight
    #[error("{0} is already running")]
    AlreadyRunning(Strategy),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Worker pool could not be built or a unit's result was lost
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

fn object_suffix(object: &Option<ObjectId>) -> String {
    object.map(|o| format!(" for {o}")).unwrap_or_default()
}

impl BenchError {
    /// Confinement violation caused by a store error
    #[must_use]
    pub fn confinement(object: Option<ObjectId>, source: &StoreError) -> Self {
        Self::ConfinementViolation {
            object,
            reason: source.to_string(),
        }
    }

    /// Store unavailability caused by a store error
    #[must_use]
    pub fn unavailable(source: &StoreError) -> Self {
        Self::StoreUnavailable(source.to_string())
    }

    /// Check if this is a confinement violation
    #[inline]
    #[must_use]
    pub fn is_confinement_violation(&self) -> bool {
        matches!(self, Self::ConfinementViolation { .. })
    }

    /// Check if the run was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
