//! Benchmark harness
//!
//! Ties the dispatcher to the result board: a run is marked running, the
//! strategy executes, and only a fully successful run is published.

use crate::aggregator::StrategyResult;
use crate::board::ResultBoard;
use crate::cancel::CancelToken;
use crate::config::BenchmarkConfig;
use crate::dispatcher::Dispatcher;
use crate::error::BenchError;
use crate::strategy::Strategy;
use crate::work_item::WorkItem;
use std::sync::Arc;

/// Outcome of one strategy within a batch
pub type RunOutcome = (Strategy, Result<StrategyResult, BenchError>);

/// Runs strategies and publishes their results
#[derive(Debug)]
pub struct Harness {
    dispatcher: Dispatcher,
    config: BenchmarkConfig,
    board: Arc<ResultBoard>,
}

impl Harness {
    /// Create a harness with a fresh result board
    ///
    /// # Errors
    /// `BenchError::Config` or `BenchError::WorkerPool` if the worker pool
    /// cannot be set up
    pub fn new(config: BenchmarkConfig) -> Result<Self, BenchError> {
        Self::with_board(config, Arc::new(ResultBoard::new()))
    }

    /// Create a harness that publishes into an existing board
    ///
    /// # Errors
    /// See [`Harness::new`]
    pub fn with_board(config: BenchmarkConfig, board: Arc<ResultBoard>) -> Result<Self, BenchError> {
        Ok(Self {
            dispatcher: Dispatcher::new(&config)?,
            config,
            board,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Board the harness publishes into
    #[inline]
    #[must_use]
    pub fn board(&self) -> &Arc<ResultBoard> {
        &self.board
    }

    /// Run one strategy to completion
    ///
    /// # Errors
    /// See [`Harness::run_with_cancel`]
    pub fn run(&self, strategy: Strategy, item: &WorkItem) -> Result<StrategyResult, BenchError> {
        self.run_with_cancel(strategy, item, &CancelToken::new())
    }

    /// Run one strategy, stopping early if `cancel` fires
    ///
    /// On success the result replaces that strategy's slot on the board. On
    /// failure nothing is published.
    ///
    /// # Errors
    /// - `BenchError::AlreadyRunning` if `strategy` is already in flight
    /// - any error from [`Dispatcher::dispatch`]
    pub fn run_with_cancel(
        &self,
        strategy: Strategy,
        item: &WorkItem,
        cancel: &CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        self.board.begin(strategy)?;

        match self.dispatcher.dispatch(strategy, item, &self.config, cancel) {
            Ok(result) => {
                self.board.publish(result.clone());
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    tracing::warn!(%strategy, error = %e, "run cancelled");
                } else {
                    tracing::error!(%strategy, error = %e, "run failed");
                }
                self.board.fail(strategy, &e);
                Err(e)
            }
        }
    }

    /// Run `strategies` one after another
    ///
    /// A failing strategy does not stop the ones after it.
    #[must_use]
    pub fn run_selected(
        &self,
        strategies: &[Strategy],
        item: &WorkItem,
        cancel: &CancelToken,
    ) -> Vec<RunOutcome> {
        strategies
            .iter()
            .map(|&strategy| (strategy, self.run_with_cancel(strategy, item, cancel)))
            .collect()
    }

    /// Run all four strategies in their canonical order
    #[must_use]
    pub fn run_all(&self, item: &WorkItem) -> Vec<RunOutcome> {
        self.run_selected(&Strategy::ALL, item, &CancelToken::new())
    }

    /// Run one strategy on the blocking pool without stalling the runtime
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Any error from [`Harness::run_with_cancel`], or
    /// `BenchError::WorkerPool` if the blocking task panicked
    pub async fn spawn_run(
        self: &Arc<Self>,
        strategy: Strategy,
        item: WorkItem,
        cancel: CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        let harness = Arc::clone(self);
        tokio::task::spawn_blocking(move || harness.run_with_cancel(strategy, &item, &cancel))
            .await
            .map_err(|e| BenchError::WorkerPool(format!("run task failed: {e}")))?
    }
}
