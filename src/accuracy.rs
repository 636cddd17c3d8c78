//! GPS accuracy classification and the two dataset views built from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit the source records its distance-to-target in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Meters,
    Kilometers,
}

impl DistanceUnit {
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            DistanceUnit::Meters => value,
            DistanceUnit::Kilometers => value * 1000.0,
        }
    }
}

/// Classifies a delivery as accurate when its distance to target is within
/// the threshold (inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyFilter {
    threshold_m: f64,
}

impl AccuracyFilter {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// `distance_m` must already be in meters. A missing distance is never accurate.
    pub fn is_accurate(&self, distance_m: Option<f64>) -> bool {
        match distance_m {
            // Converting 0.08 km yields 80.00000000000001; round to the
            // micrometre so the boundary stays inclusive across units.
            Some(d) if d.is_finite() => round_um(d) <= round_um(self.threshold_m),
            _ => false,
        }
    }
}

fn round_um(meters: f64) -> f64 {
    (meters * 1_000_000.0).round() / 1_000_000.0
}

impl Default for AccuracyFilter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ACCURACY_THRESHOLD_M)
    }
}

/// Which records feed an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    AllRecords,
    AccurateOnly,
}

impl View {
    pub const ALL: [View; 2] = [View::AllRecords, View::AccurateOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::AllRecords => "all_records",
            View::AccurateOnly => "accurate_only",
        }
    }

    pub fn includes(&self, accurate: bool) -> bool {
        match self {
            View::AllRecords => true,
            View::AccurateOnly => accurate,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
