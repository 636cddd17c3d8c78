//! Report types produced by one pipeline run.

use crate::accuracy::View;
use crate::analyzers::comparison::Comparison;
use crate::analyzers::daily::DailyPace;
use crate::analyzers::outliers::OutlierReport;
use crate::analyzers::summary::{HistogramBin, SummaryStatistics};
use crate::analyzers::temporal::TemporalBreakdown;
use crate::config::SiteId;
use crate::error::PaceError;
use crate::records::DataQuality;
use serde::Serialize;

/// Outlier audit and statistics for a view whose series was usable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Benchmark {
    pub outliers: OutlierReport,
    pub summary: SummaryStatistics,
    pub histogram: Vec<HistogramBin>,
}

impl Benchmark {
    pub fn value(&self) -> f64 {
        self.summary.benchmark()
    }
}

/// Results for one (city, year, view).
#[derive(Debug, Serialize)]
pub struct ViewReport {
    pub view: View,
    pub records: usize,
    pub daily_pace: Vec<DailyPace>,
    #[serde(serialize_with = "serialize_outcome")]
    pub benchmark: Result<Benchmark, PaceError>,
    pub temporal: TemporalBreakdown,
}

impl ViewReport {
    pub fn benchmark_value(&self) -> Option<f64> {
        self.benchmark.as_ref().ok().map(Benchmark::value)
    }
}

/// Results for one (city, year): both views and their comparison.
#[derive(Debug, Serialize)]
pub struct SiteReport {
    pub site: SiteId,
    pub quality: DataQuality,
    pub views: Vec<ViewReport>,
    #[serde(serialize_with = "serialize_outcome")]
    pub comparison: Result<Comparison, PaceError>,
}

impl SiteReport {
    pub fn view(&self, view: View) -> Option<&ViewReport> {
        self.views.iter().find(|v| v.view == view)
    }
}

/// Serializes `Ok(v)` as `{"ok": v}` and `Err(e)` as `{"error": "..."}`.
fn serialize_outcome<T, S>(
    outcome: &Result<T, PaceError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    T: Serialize,
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(1))?;
    match outcome {
        Ok(v) => map.serialize_entry("ok", v)?,
        Err(e) => map.serialize_entry("error", &e.to_string())?,
    }
    map.end()
}
