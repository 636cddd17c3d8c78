//! Descriptive statistics over a cleaned daily-pace series.
//!
//! The mean is the delivery-pace benchmark. Percentiles use the same linear
//! interpolation as the outlier fences. With a single value the spread
//! statistics are left empty instead of collapsing onto that value.

use crate::analyzers::utility::{finite_sorted, mean, quantile_sorted, sample_stddev};
use crate::error::{PaceError, Result};
use serde::Serialize;

const STAGE: &str = "summary statistics";

/// Fewest values for which median, IQR and percentiles are reported.
pub const MIN_SPREAD_POINTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: f64,
    /// Median, spread and percentiles are `None` when fewer than
    /// [`MIN_SPREAD_POINTS`] values remain.
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub iqr: Option<f64>,
    pub p80: Option<f64>,
    pub p90: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl SummaryStatistics {
    /// Summarizes `values`, ignoring non-finite entries.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let sorted = finite_sorted(values);
        if sorted.is_empty() {
            return Err(PaceError::DegenerateStatistics {
                stage: STAGE,
                points: 0,
            });
        }
        let spread = sorted.len() >= MIN_SPREAD_POINTS;
        let q = |p: f64| -> Result<Option<f64>> {
            if spread {
                quantile_sorted(&sorted, p, STAGE).map(Some)
            } else {
                Ok(None)
            }
        };
        let iqr = match (q(0.25)?, q(0.75)?) {
            (Some(q1), Some(q3)) => Some(q3 - q1),
            _ => None,
        };

        Ok(Self {
            count: sorted.len(),
            mean: mean(&sorted, STAGE)?,
            median: q(0.5)?,
            std_dev: sample_stddev(&sorted, STAGE).ok(),
            iqr,
            p80: q(0.8)?,
            p90: q(0.9)?,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }

    pub fn benchmark(&self) -> f64 {
        self.mean
    }
}

/// One equal-width bin of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Splits `[min, max]` into `bins` equal-width bins; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let sorted = finite_sorted(values);
    if sorted.is_empty() || bins == 0 {
        return Vec::new();
    }
    let (min, max) = (sorted[0], sorted[sorted.len() - 1]);
    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: sorted.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for v in sorted {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}
