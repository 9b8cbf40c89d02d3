//! Strategy dispatcher
//!
//! Runs `outer_iterations` units of the kernel either one after another on
//! the calling thread or spread over a dedicated rayon pool. Every unit
//! derives its own handle; confined units also get their own context. The
//! run is timed from just before the first unit is dispatched to just after
//! the last one has returned.

use crate::aggregator::{Collected, Stopwatch, StrategyResult, UnitCollector, UnitOutput};
use crate::cancel::CancelToken;
use crate::config::BenchmarkConfig;
use crate::confinement::with_confined;
use crate::error::BenchError;
use crate::handle::ResourceHandle;
use crate::kernel::leibniz_pi;
use crate::strategy::{FanOut, Strategy, Target};
use crate::work_item::WorkItem;
use crossbeam::channel::Sender;
use rayon::prelude::*;
use std::sync::Arc;

/// Everything one unit needs, shared read-only across workers
struct UnitPlan<'a> {
    strategy: Strategy,
    handle: &'a ResourceHandle,
    inner: u64,
    total: u64,
    cancel: &'a CancelToken,
}

impl UnitPlan<'_> {
    fn execute(&self, unit: u64) -> Result<f64, BenchError> {
        if self.cancel.is_cancelled() {
            // completed count is filled in once the run has drained
            return Err(BenchError::Cancelled {
                strategy: self.strategy,
                completed: 0,
                total: self.total,
            });
        }

        let value = with_confined(self.handle, |acc| leibniz_pi(acc, self.inner))?;
        tracing::trace!(strategy = %self.strategy, unit, value, "unit finished");
        Ok(value)
    }

    fn deliver(&self, unit: u64, tx: &Sender<UnitOutput>) -> Result<(), BenchError> {
        let value = self.execute(unit)?;
        tx.send(UnitOutput { unit, value })
            .map_err(|_| BenchError::WorkerPool("result channel closed".to_string()))
    }
}

/// Executes strategies over a dedicated worker pool
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<rayon::ThreadPool>,
    workers: usize,
    collector: UnitCollector,
}

impl Dispatcher {
    /// Build a dispatcher with a pool sized from `config`
    ///
    /// # Errors
    /// `BenchError::Config` for invalid settings, `BenchError::WorkerPool` if
    /// the pool cannot be created
    pub fn new(config: &BenchmarkConfig) -> Result<Self, BenchError> {
        config.validate()?;
        let workers = config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("confbench-worker-{i}"))
            .build()
            .map_err(|e| BenchError::WorkerPool(format!("failed to create thread pool: {e}")))?;

        tracing::debug!(workers, "worker pool ready");
        Ok(Self {
            pool: Arc::new(pool),
            workers,
            collector: UnitCollector::new(),
        })
    }

    /// Threads in the worker pool
    #[inline]
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `strategy` against `item`
    ///
    /// The pool is sized once in [`Dispatcher::new`]; `config` supplies the
    /// iteration counts and must resolve to the same worker count.
    ///
    /// # Errors
    /// - `BenchError::ConfinementViolation` if a confined unit cannot derive
    ///   its handle; the remaining units are not started
    /// - `BenchError::Cancelled` if `cancel` fires before every unit started
    /// - `BenchError::Config` if `config` is invalid or asks for a different
    ///   worker count than the pool was built with
    /// - `BenchError::WorkerPool` if unit results cannot be collected
    pub fn dispatch(
        &self,
        strategy: Strategy,
        item: &WorkItem,
        config: &BenchmarkConfig,
        cancel: &CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        config.validate()?;
        let requested = config.worker_count();
        if requested != self.workers {
            return Err(BenchError::Config(format!(
                "config asks for {requested} workers but the pool has {}",
                self.workers
            )));
        }
        let handle = match strategy.target() {
            Target::Plain => item.plain_handle(),
            Target::Confined => item.confined_handle()?,
        };
        self.execute(strategy, &handle, config, cancel)
    }

    /// Serial units over a plain value
    ///
    /// # Errors
    /// See [`Dispatcher::dispatch`]
    pub fn run_serial_plain(
        &self,
        item: &WorkItem,
        config: &BenchmarkConfig,
        cancel: &CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        self.dispatch(Strategy::SerialPlain, item, config, cancel)
    }

    /// Parallel units over a plain value
    ///
    /// # Errors
    /// See [`Dispatcher::dispatch`]
    pub fn run_parallel_plain(
        &self,
        item: &WorkItem,
        config: &BenchmarkConfig,
        cancel: &CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        self.dispatch(Strategy::ParallelPlain, item, config, cancel)
    }

    /// Serial units, each in a fresh context
    ///
    /// # Errors
    /// See [`Dispatcher::dispatch`]
    pub fn run_serial_confined(
        &self,
        item: &WorkItem,
        config: &BenchmarkConfig,
        cancel: &CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        self.dispatch(Strategy::SerialConfined, item, config, cancel)
    }

    /// Parallel units, each in a fresh context on its worker thread
    ///
    /// # Errors
    /// See [`Dispatcher::dispatch`]
    pub fn run_parallel_confined(
        &self,
        item: &WorkItem,
        config: &BenchmarkConfig,
        cancel: &CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        self.dispatch(Strategy::ParallelConfined, item, config, cancel)
    }

    fn execute(
        &self,
        strategy: Strategy,
        handle: &ResourceHandle,
        config: &BenchmarkConfig,
        cancel: &CancelToken,
    ) -> Result<StrategyResult, BenchError> {
        let total = config.outer_iterations;
        let plan = UnitPlan {
            strategy,
            handle,
            inner: config.inner_iterations,
            total,
            cancel,
        };
        tracing::debug!(
            %strategy,
            outer = total,
            inner = plan.inner,
            workers = self.workers,
            "dispatching"
        );

        let stopwatch = Stopwatch::start();
        let (outcome, collected) = match strategy.fan_out() {
            FanOut::Serial => {
                let mut collected = Collected::default();
                let outcome = (0..total)
                    .try_for_each(|unit| plan.execute(unit).map(|value| collected.record(value)));
                (outcome, collected)
            }
            FanOut::Parallel => self.collector.collect(|tx| {
                self.pool.install(|| {
                    (0..total)
                        .into_par_iter()
                        .try_for_each_with(tx, |tx, unit| plan.deliver(unit, tx))
                })
            }),
        };
        let elapsed_millis = stopwatch.elapsed_millis();

        match outcome {
            Ok(()) => {
                if collected.divergent > 0 {
                    tracing::warn!(
                        %strategy,
                        divergent = collected.divergent,
                        "units disagreed on the result"
                    );
                }
                let result = StrategyResult::from_collected(strategy, elapsed_millis, &collected);
                tracing::info!(
                    %strategy,
                    elapsed_ms = elapsed_millis,
                    value = ?result.value,
                    units = result.units_completed,
                    "strategy finished"
                );
                Ok(result)
            }
            Err(BenchError::Cancelled { .. }) => Err(BenchError::Cancelled {
                strategy,
                completed: collected.completed,
                total,
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::leibniz_pi_plain;
    use confbench_store::Store;

    fn config() -> BenchmarkConfig {
        BenchmarkConfig::new()
            .with_outer_iterations(8)
            .with_inner_iterations(1_000)
            .with_workers(2)
    }

    #[test]
    fn pool_has_requested_workers() {
        let dispatcher = Dispatcher::new(&config()).unwrap();
        assert_eq!(dispatcher.workers(), 2);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = Dispatcher::new(&BenchmarkConfig::new().with_workers(0)).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn every_strategy_agrees_on_the_value() {
        let store = Store::new();
        let record = store.insert(0.37).unwrap();
        let item = WorkItem::fetch(&store, record).unwrap();
        let dispatcher = Dispatcher::new(&config()).unwrap();

        for strategy in Strategy::ALL {
            let result = dispatcher
                .dispatch(strategy, &item, &config(), &CancelToken::new())
                .unwrap();
            assert_eq!(result.strategy, strategy);
            assert_eq!(result.units_completed, 8);
            assert_eq!(result.value, Some(leibniz_pi_plain(1_000)));
        }
        // one context per confined unit, two confined strategies
        assert_eq!(store.contexts_created(), 16);
        assert_eq!(store.value(record).unwrap(), 0.37);
    }

    #[test]
    fn zero_units_publishes_no_value() {
        let dispatcher = Dispatcher::new(&config()).unwrap();
        let result = dispatcher
            .run_parallel_plain(
                &WorkItem::synthetic(0.37),
                &config().with_outer_iterations(0),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(result.value, None);
        assert_eq!(result.units_completed, 0);
    }

    #[test]
    fn synthetic_item_cannot_run_confined() {
        let dispatcher = Dispatcher::new(&config()).unwrap();
        let err = dispatcher
            .run_serial_confined(&WorkItem::synthetic(0.37), &config(), &CancelToken::new())
            .unwrap_err();
        assert!(err.is_confinement_violation());
    }

    #[test]
    fn cancelled_before_start() {
        let dispatcher = Dispatcher::new(&config()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = dispatcher
            .run_serial_plain(&WorkItem::synthetic(0.37), &config(), &cancel)
            .unwrap_err();
        assert_eq!(
            err,
            BenchError::Cancelled {
                strategy: Strategy::SerialPlain,
                completed: 0,
                total: 8,
            }
        );
    }

    #[test]
    fn dropped_store_fails_parallel_confined() {
        let store = Store::new();
        let record = store.insert(0.37).unwrap();
        let item = WorkItem::fetch(&store, record).unwrap();
        drop(store);

        let dispatcher = Dispatcher::new(&config()).unwrap();
        let err = dispatcher
            .run_parallel_confined(&item, &config(), &CancelToken::new())
            .unwrap_err();
        assert!(err.is_confinement_violation());
    }

    #[test]
    fn many_empty_units_fold_in_place() {
        let config = BenchmarkConfig::new()
            .with_outer_iterations(1_000_000)
            .with_inner_iterations(0)
            .with_workers(2);
        let dispatcher = Dispatcher::new(&config).unwrap();
        let item = WorkItem::synthetic(0.37);

        for strategy in [Strategy::SerialPlain, Strategy::ParallelPlain] {
            let result = dispatcher
                .dispatch(strategy, &item, &config, &CancelToken::new())
                .unwrap();
            assert_eq!(result.units_completed, 1_000_000, "{strategy}");
            assert_eq!(result.value, Some(0.0), "{strategy}");
        }
    }

    #[test]
    fn mismatched_worker_count_is_rejected() {
        let dispatcher = Dispatcher::new(&config().with_workers(4)).unwrap();
        let err = dispatcher
            .run_parallel_plain(
                &WorkItem::synthetic(0.37),
                &config().with_workers(1),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, BenchError::Config(msg) if msg.contains("4")));
    }
}
