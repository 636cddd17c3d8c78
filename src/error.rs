//! Error types for the benchmark pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaceError {
    /// A statistic was requested over a series too small to support it.
    #[error("degenerate statistics in {stage}: {points} usable point(s)")]
    DegenerateStatistics { stage: &'static str, points: usize },

    #[error("unfiltered benchmark is zero or not finite; percentage difference is undefined")]
    ZeroBaseline,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("column '{column}' not found in {file}")]
    MissingColumn { column: String, file: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PaceError>;
