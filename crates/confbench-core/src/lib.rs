//! confbench Core - confinement benchmark harness
//!
//! Measures what thread confinement costs by running the same numeric
//! kernel four ways:
//! - serially or in parallel over a dedicated worker pool
//! - against a plain number or against a store-managed value that must be
//!   re-derived inside a fresh context for every unit of work
//!
//! # Example
//!
//! ```rust
//! use confbench_core::{BenchmarkConfig, Harness, Strategy, WorkItem};
//! use confbench_store::Store;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::new();
//! store.insert(0.37)?;
//! let item = WorkItem::first_in(&store)?;
//!
//! let config = BenchmarkConfig::new()
//!     .with_outer_iterations(4)
//!     .with_inner_iterations(1_000);
//! let harness = Harness::new(config)?;
//!
//! for (strategy, outcome) in harness.run_all(&item) {
//!     let result = outcome?;
//!     println!("{} {} ms {:?}", strategy.label(), result.elapsed_millis, result.value);
//! }
//! assert!(harness.board().get(Strategy::ParallelConfined).is_some());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod aggregator;
pub mod board;
pub mod cancel;
pub mod config;
pub mod confinement;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod harness;
pub mod kernel;
pub mod report;
pub mod strategy;
pub mod work_item;

// Re-exports for convenience
pub use aggregator::{Collected, Stopwatch, StrategyResult, UnitCollector, UnitOutput};
pub use board::{BoardSnapshot, ResultBoard};
pub use cancel::CancelToken;
pub use config::{BenchmarkConfig, DEFAULT_INNER_ITERATIONS, DEFAULT_OUTER_ITERATIONS};
pub use confinement::{derive_confined, open_context, with_confined};
pub use dispatcher::Dispatcher;
pub use error::BenchError;
pub use handle::{ConfinedRef, DerivedHandle, ResourceHandle};
pub use harness::{Harness, RunOutcome};
pub use kernel::{error_bound, leibniz_pi, leibniz_pi_plain, Accumulator};
pub use report::{render_json, render_text};
pub use strategy::{FanOut, ParseStrategyError, RunState, Strategy, Target};
pub use work_item::WorkItem;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running benchmarks
    pub use crate::{
        BenchError, BenchmarkConfig, CancelToken, Harness, ResultBoard, Strategy,
        StrategyResult, WorkItem,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
