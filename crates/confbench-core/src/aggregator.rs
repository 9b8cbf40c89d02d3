//! Result and timing aggregation
//!
//! Units never write a shared variable. Serial runs fold each output into
//! one [`Collected`] in place; parallel units send theirs over a bounded
//! channel that a collector thread folds as outputs arrive. The fold is
//! read only after the completion barrier, so it is complete and race-free.

use crate::error::BenchError;
use crate::strategy::Strategy;
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Sender};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Monotonic wall-clock timer
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Start timing now
    #[inline]
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Time since start
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whole milliseconds since start (truncated)
    #[inline]
    #[must_use]
    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Output of one unit of work
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitOutput {
    /// Outer iteration index
    pub unit: u64,
    /// Kernel result
    pub value: f64,
}

/// Running fold of every unit output seen so far
///
/// Fixed size no matter how many units a run has.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Collected {
    /// Units that delivered a value
    pub completed: u64,
    /// Value of the last unit to deliver
    pub last: Option<f64>,
    /// Units whose value differed from the first delivered value
    pub divergent: u64,
    first: Option<f64>,
}

impl Collected {
    /// Fold one delivered value
    pub fn record(&mut self, value: f64) {
        self.completed += 1;
        match self.first {
            None => self.first = Some(value),
            Some(expected) if expected.to_bits() != value.to_bits() => self.divergent += 1,
            Some(_) => {}
        }
        self.last = Some(value);
    }
}

/// Folds unit outputs from many workers as they arrive
///
/// Workers send over a bounded channel; a dedicated thread drains it into a
/// single [`Collected`] while the units run, so a full channel only ever
/// delays a sender.
#[derive(Debug, Clone, Copy)]
pub struct UnitCollector {
    capacity: usize,
}

impl UnitCollector {
    /// Default channel capacity
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Collector with [`UnitCollector::DEFAULT_CAPACITY`]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Collector whose channel holds at most `capacity` pending outputs
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    /// Pending outputs the channel can hold
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `produce` with a sender while folding everything it delivers
    ///
    /// Returns once `produce` has returned and every sender it cloned has
    /// been dropped, together with the fold of all delivered outputs. A
    /// panic in the collector thread becomes `BenchError::WorkerPool`.
    pub fn collect<F>(&self, produce: F) -> (Result<(), BenchError>, Collected)
    where
        F: FnOnce(Sender<UnitOutput>) -> Result<(), BenchError>,
    {
        let (tx, rx) = channel::bounded::<UnitOutput>(self.capacity);

        let scoped = crossbeam::thread::scope(|scope| {
            let folder = scope.spawn(move |_| {
                let mut collected = Collected::default();
                for output in rx.iter() {
                    collected.record(output.value);
                }
                collected
            });
            let outcome = produce(tx);
            let collected = folder.join();
            (outcome, collected)
        });

        match scoped {
            Ok((outcome, Ok(collected))) => (outcome, collected),
            Ok((_, Err(_))) | Err(_) => (
                Err(BenchError::WorkerPool("unit collector panicked".to_string())),
                Collected::default(),
            ),
        }
    }
}

impl Default for UnitCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Published outcome of one strategy run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    /// Strategy that produced this result
    pub strategy: Strategy,
    /// Wall-clock time from dispatch to completion barrier
    pub elapsed_millis: u64,
    /// Value of the last unit to finish; `None` when no unit ran
    pub value: Option<f64>,
    /// Units that completed
    pub units_completed: u64,
    /// When the run completed
    pub completed_at: DateTime<Utc>,
}

impl StrategyResult {
    /// Build a result from a finished run
    #[must_use]
    pub fn from_collected(strategy: Strategy, elapsed_millis: u64, collected: &Collected) -> Self {
        Self {
            strategy,
            elapsed_millis,
            value: collected.last,
            units_completed: collected.completed,
            completed_at: Utc::now(),
        }
    }
}
