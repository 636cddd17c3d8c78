use crate::error::{PaceError, Result};
use serde::Serialize;

/// Benchmarks of both views for one site, side by side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub unfiltered: f64,
    pub filtered: f64,
    pub pct_difference: f64,
}

/// `(unfiltered - filtered) / unfiltered * 100`.
pub fn pct_difference(unfiltered: f64, filtered: f64) -> Result<f64> {
    if unfiltered == 0.0 || !unfiltered.is_finite() {
        return Err(PaceError::ZeroBaseline);
    }
    if !filtered.is_finite() {
        return Err(PaceError::DegenerateStatistics {
            stage: "comparison",
            points: 0,
        });
    }
    Ok((unfiltered - filtered) / unfiltered * 100.0)
}

pub fn compare(unfiltered: f64, filtered: f64) -> Result<Comparison> {
    Ok(Comparison {
        unfiltered,
        filtered,
        pct_difference: pct_difference(unfiltered, filtered)?,
    })
}
