//! Rendering of published results

use crate::board::BoardSnapshot;
use crate::error::BenchError;
use crate::strategy::Strategy;
use std::fmt::Write as _;

/// Width of the label column
const LABEL_WIDTH: usize = 18;

/// One line per strategy in canonical order: label, elapsed time, value
///
/// Strategies without a published result show `-` in both columns.
#[must_use]
pub fn render_text(snapshot: &BoardSnapshot) -> String {
    let mut out = String::new();
    for strategy in Strategy::ALL {
        let (elapsed, value) = match snapshot.get(strategy) {
            Some(result) => (
                format!("{} ms", result.elapsed_millis),
                result
                    .value
                    .map_or_else(|| "-".to_string(), |v| v.to_string()),
            ),
            None => ("- ms".to_string(), "-".to_string()),
        };
        let _ = writeln!(
            out,
            "{:<LABEL_WIDTH$} {elapsed:>10}  {value}",
            strategy.label()
        );
    }
    out
}

/// Published results as pretty-printed JSON
///
/// # Errors
/// `BenchError::Config` if serialization fails
pub fn render_json(snapshot: &BoardSnapshot) -> Result<String, BenchError> {
    serde_json::to_string_pretty(snapshot)
        .map_err(|e| BenchError::Config(format!("failed to serialize results: {e}")))
}
