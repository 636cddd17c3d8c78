//! Interquartile-range outlier removal over a daily-pace series.
//!
//! Fences are computed once from the full series and then applied; the
//! filtered result is never re-fenced.

use crate::analyzers::daily::DailyPace;
use crate::analyzers::utility::{finite_sorted, quantile_sorted};
use crate::error::{PaceError, Result};
use serde::Serialize;
use tracing::{debug, warn};

const STAGE: &str = "outlier removal";
pub const FENCE_MULTIPLIER: f64 = 1.5;
/// Below this many points the quartiles say little about the spread.
pub const MIN_RECOMMENDED_POINTS: usize = 4;

/// Quartiles and fences of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFences {
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let sorted = finite_sorted(values);
        let q1 = quantile_sorted(&sorted, 0.25, STAGE)?;
        let q3 = quantile_sorted(&sorted, 0.75, STAGE)?;
        let iqr = q3 - q1;
        Ok(Self {
            q1,
            q3,
            iqr,
            lower: q1 - FENCE_MULTIPLIER * iqr,
            upper: q3 + FENCE_MULTIPLIER * iqr,
        })
    }

    pub fn contains(&self, v: f64) -> bool {
        v.is_finite() && v >= self.lower && v <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub fences: IqrFences,
    pub points: usize,
    pub dropped: usize,
    /// Surviving days, still in date order.
    pub retained: Vec<DailyPace>,
}

impl OutlierReport {
    pub fn retained_values(&self) -> Vec<f64> {
        self.retained.iter().map(|d| d.pace).collect()
    }
}

/// Drops days whose pace lies outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
pub fn remove_outliers(series: &[DailyPace]) -> Result<OutlierReport> {
    let values: Vec<f64> = series.iter().map(|d| d.pace).collect();
    let fences = IqrFences::from_values(&values)?;

    if series.len() < MIN_RECOMMENDED_POINTS {
        warn!(
            points = series.len(),
            min_recommended = MIN_RECOMMENDED_POINTS,
            "IQR fences computed over very few days"
        );
    }

    let retained: Vec<DailyPace> = series
        .iter()
        .filter(|d| fences.contains(d.pace))
        .cloned()
        .collect();
    let dropped = series.len() - retained.len();

    debug!(
        q1 = fences.q1,
        q3 = fences.q3,
        iqr = fences.iqr,
        dropped,
        "Outlier days removed"
    );

    if retained.is_empty() {
        return Err(PaceError::DegenerateStatistics {
            stage: STAGE,
            points: 0,
        });
    }

    Ok(OutlierReport {
        fences,
        points: series.len(),
        dropped,
        retained,
    })
}
