use crate::accuracy::{AccuracyFilter, View};
use crate::analyzers::comparison::compare;
use crate::analyzers::daily::{DailyPace, daily_pace};
use crate::analyzers::outliers::remove_outliers;
use crate::analyzers::summary::{SummaryStatistics, histogram};
use crate::analyzers::temporal::temporal_breakdown;
use crate::analyzers::types::{Benchmark, SiteReport, ViewReport};
use crate::config::{DEFAULT_HISTOGRAM_BINS, PipelineConfig, SourceConfig};
use crate::error::{PaceError, Result};
use crate::ingest::load_source;
use crate::records::{DeliveryRecord, NormalizedRecord, normalize_records};
use tracing::{error, info, warn};

/// Settings shared by every pipeline instance in a run.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub filter: AccuracyFilter,
    pub histogram_bins: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            filter: AccuracyFilter::default(),
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

impl From<&PipelineConfig> for RunSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            filter: AccuracyFilter::new(config.accuracy_threshold_m),
            histogram_bins: config.histogram_bins,
        }
    }
}

/// Removes outlier days and summarizes what is left.
pub fn benchmark_series(series: &[DailyPace], bins: usize) -> Result<Benchmark> {
    let outliers = remove_outliers(series)?;
    let cleaned = outliers.retained_values();
    let summary = SummaryStatistics::from_values(&cleaned)?;
    Ok(Benchmark {
        histogram: histogram(&cleaned, bins),
        outliers,
        summary,
    })
}

fn analyze_view(records: &[NormalizedRecord], view: View, settings: &RunSettings) -> ViewReport {
    let daily = daily_pace(records, view);
    let benchmark = benchmark_series(&daily, settings.histogram_bins);

    match &benchmark {
        Ok(b) => info!(
            %view,
            days = daily.len(),
            dropped_days = b.outliers.dropped,
            benchmark = b.value(),
            "View benchmarked"
        ),
        Err(e) => warn!(%view, days = daily.len(), error = %e, "View has no usable benchmark"),
    }

    ViewReport {
        view,
        records: records.iter().filter(|r| r.in_view(view)).count(),
        temporal: temporal_breakdown(records, view),
        daily_pace: daily,
        benchmark,
    }
}

/// Runs the full pipeline over already-loaded records of one source.
#[tracing::instrument(skip_all, fields(city = %source.city, year = source.year))]
pub fn analyze_records(
    source: &SourceConfig,
    records: &[DeliveryRecord],
    settings: &RunSettings,
) -> SiteReport {
    let (normalized, quality) = normalize_records(
        records,
        &source.date_formats,
        source.distance_unit,
        &settings.filter,
    );

    info!(
        records_in = quality.records_in,
        kept = quality.records_kept,
        dropped = quality.dropped(),
        accurate = quality.accurate,
        missing_distance = quality.missing_distance,
        invalid_utf8 = quality.invalid_utf8,
        "Records normalized"
    );

    let views: Vec<ViewReport> = View::ALL
        .iter()
        .map(|&view| analyze_view(&normalized, view, settings))
        .collect();

    let benchmark_of = |view: View| {
        views
            .iter()
            .find(|r| r.view == view)
            .and_then(ViewReport::benchmark_value)
    };
    let comparison = match (benchmark_of(View::AllRecords), benchmark_of(View::AccurateOnly)) {
        (Some(all), Some(accurate)) => compare(all, accurate),
        _ => Err(PaceError::DegenerateStatistics {
            stage: "comparison",
            points: 0,
        }),
    };

    SiteReport {
        site: source.site(),
        quality,
        views,
        comparison,
    }
}

/// Loads a source's files and analyzes them.
pub fn analyze_source(source: &SourceConfig, settings: &RunSettings) -> Result<SiteReport> {
    let records = load_source(source)?;
    Ok(analyze_records(source, &records, settings))
}

/// Analyzes every configured source. A source that cannot be loaded is
/// logged and skipped so the others still complete.
pub fn analyze_all(config: &PipelineConfig) -> Vec<SiteReport> {
    let settings = RunSettings::from(config);
    let mut reports = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        match analyze_source(source, &settings) {
            Ok(report) => reports.push(report),
            Err(e) => error!(site = %source.site(), error = %e, "Source skipped"),
        }
    }

    reports
}
