//! Benchmark configuration
//!
//! Defaults reproduce the reference workload: 200 outer iterations of a
//! 500 000-term series, on a pool sized to the machine.

use crate::error::BenchError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Default number of outer iterations (units of work)
pub const DEFAULT_OUTER_ITERATIONS: u64 = 200;

/// Default number of series terms per unit
pub const DEFAULT_INNER_ITERATIONS: u64 = 500_000;

/// Work volume and pool sizing for a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
    /// Units of work per run
    pub outer_iterations: u64,
    /// Series terms per unit
    pub inner_iterations: u64,
    /// Worker threads for parallel strategies (`None` = available parallelism)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl BenchmarkConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With outer iteration count
    #[inline]
    #[must_use]
    pub fn with_outer_iterations(mut self, outer: u64) -> Self {
        self.outer_iterations = outer;
        self
    }

    /// With inner iteration count
    #[inline]
    #[must_use]
    pub fn with_inner_iterations(mut self, inner: u64) -> Self {
        self.inner_iterations = inner;
        self
    }

    /// With a fixed worker count
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Check the configuration
    ///
    /// # Errors
    /// `BenchError::Config` if `workers` is zero
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.workers == Some(0) {
            return Err(BenchError::Config(
                "workers must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Worker threads the parallel strategies will use
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.filter(|w| *w > 0).unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        })
    }

    /// Parse a TOML document
    ///
    /// Missing keys fall back to defaults.
    ///
    /// # Errors
    /// `BenchError::Config` on malformed TOML, unknown keys or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self, BenchError> {
        let config: Self =
            toml::from_str(text).map_err(|e| BenchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// `BenchError::Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BenchError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// `BenchError::Config` if serialization fails
    pub fn to_toml_string(&self) -> Result<String, BenchError> {
        toml::to_string(self).map_err(|e| BenchError::Config(e.to_string()))
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            outer_iterations: DEFAULT_OUTER_ITERATIONS,
            inner_iterations: DEFAULT_INNER_ITERATIONS,
            workers: None,
        }
    }
}
