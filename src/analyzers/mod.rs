//! Daily-pace aggregation and benchmarking.
//!
//! Normalized records are counted per enumerator per day, averaged into a
//! daily pace, stripped of outlier days with the IQR rule, and summarized.
//! The all-records and accurate-only views share this path.

pub mod analyzer;
pub mod comparison;
pub mod daily;
pub mod outliers;
pub mod summary;
pub mod temporal;
pub mod types;
pub mod utility;
