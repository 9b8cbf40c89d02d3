//! Published results
//!
//! One slot per strategy. Publishing replaces exactly one slot wholesale and
//! never touches the others; failed runs publish nothing. Observers either
//! poll [`ResultBoard::get`] or subscribe to snapshots.

use crate::aggregator::StrategyResult;
use crate::error::BenchError;
use crate::strategy::{RunState, Strategy};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::watch;

/// Point-in-time view of every published result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardSnapshot {
    /// Latest result per strategy; strategies never completed are absent
    pub results: BTreeMap<Strategy, StrategyResult>,
}

impl BoardSnapshot {
    /// Result for `strategy`, if any
    #[inline]
    #[must_use]
    pub fn get(&self, strategy: Strategy) -> Option<&StrategyResult> {
        self.results.get(&strategy)
    }
}

/// Shared result store for all strategies
#[derive(Debug)]
pub struct ResultBoard {
    slots: DashMap<Strategy, StrategyResult>,
    states: DashMap<Strategy, RunState>,
    updates: watch::Sender<BoardSnapshot>,
}

impl ResultBoard {
    /// Empty board, every strategy `NotStarted`
    #[must_use]
    pub fn new() -> Self {
        let (updates, _) = watch::channel(BoardSnapshot::default());
        Self {
            slots: DashMap::new(),
            states: DashMap::new(),
            updates,
        }
    }

    /// Mark `strategy` as running
    ///
    /// # Errors
    /// `BenchError::AlreadyRunning` if a run of `strategy` is in flight
    pub fn begin(&self, strategy: Strategy) -> Result<(), BenchError> {
        match self.states.entry(strategy) {
            Entry::Occupied(mut entry) => {
                if !entry.get().can_transition_to(RunState::Running) {
                    return Err(BenchError::AlreadyRunning(strategy));
                }
                entry.insert(RunState::Running);
            }
            Entry::Vacant(entry) => {
                entry.insert(RunState::Running);
            }
        }
        Ok(())
    }

    /// Publish a completed run, replacing that strategy's previous result
    ///
    /// The slot is written before the state becomes `Completed`, so a
    /// reader that sees `Completed` always finds the new result.
    pub fn publish(&self, result: StrategyResult) {
        let strategy = result.strategy;
        self.slots.insert(strategy, result.clone());
        self.updates.send_modify(|snapshot| {
            snapshot.results.insert(strategy, result);
        });
        self.transition(strategy, RunState::Completed);
    }

    /// Record a failed run; the published slot is left as it was
    pub fn fail(&self, strategy: Strategy, error: &BenchError) {
        let next = if error.is_cancelled() {
            RunState::Cancelled
        } else {
            RunState::Failed
        };
        self.transition(strategy, next);
    }

    fn transition(&self, strategy: Strategy, next: RunState) {
        let mut state = self.states.entry(strategy).or_insert(RunState::NotStarted);
        if !state.can_transition_to(next) {
            tracing::warn!(%strategy, from = ?*state, to = ?next, "unexpected run state transition");
        }
        *state = next;
    }

    /// Latest published result for `strategy`
    #[must_use]
    pub fn get(&self, strategy: Strategy) -> Option<StrategyResult> {
        self.slots.get(&strategy).map(|r| r.value().clone())
    }

    /// Lifecycle state of `strategy`
    #[must_use]
    pub fn state(&self, strategy: Strategy) -> RunState {
        self.states
            .get(&strategy)
            .map_or(RunState::NotStarted, |s| *s)
    }

    /// All published results
    #[must_use]
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            results: self
                .slots
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
        }
    }

    /// Receive a snapshot after every publish
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.updates.subscribe()
    }
}

impl Default for ResultBoard {
    fn default() -> Self {
        Self::new()
    }
}
