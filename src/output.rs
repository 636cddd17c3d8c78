//! Output formatting and persistence for pipeline reports.
//!
//! Writes CSV tables (one serialized row per record, header once) for
//! charting and a JSON dump of the full run.

use crate::accuracy::View;
use crate::analyzers::types::{SiteReport, ViewReport};
use crate::error::Result;
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `rows` to a fresh CSV file at `path`, replacing any existing file.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// One line of `summary.csv`. Numeric fields are empty when the view had no
/// usable benchmark, and `error` says why.
#[derive(Debug, Default, Serialize)]
pub struct SummaryRow {
    pub city: String,
    pub year: i32,
    pub view: String,
    pub records: usize,
    pub days: usize,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub fence_iqr: Option<f64>,
    pub lower_fence: Option<f64>,
    pub upper_fence: Option<f64>,
    pub dropped_days: Option<usize>,
    pub retained_days: Option<usize>,
    pub benchmark: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub iqr: Option<f64>,
    pub p80: Option<f64>,
    pub p90: Option<f64>,
    pub error: Option<String>,
}

impl SummaryRow {
    pub fn from_view(site: &SiteReport, view: &ViewReport) -> Self {
        let mut row = SummaryRow {
            city: site.site.city.clone(),
            year: site.site.year,
            view: view.view.to_string(),
            records: view.records,
            days: view.daily_pace.len(),
            ..Default::default()
        };

        match &view.benchmark {
            Ok(b) => {
                let f = &b.outliers.fences;
                let s = &b.summary;
                row.q1 = Some(f.q1);
                row.q3 = Some(f.q3);
                row.fence_iqr = Some(f.iqr);
                row.lower_fence = Some(f.lower);
                row.upper_fence = Some(f.upper);
                row.dropped_days = Some(b.outliers.dropped);
                row.retained_days = Some(s.count);
                row.benchmark = Some(s.mean);
                row.median = s.median;
                row.std_dev = s.std_dev;
                row.iqr = s.iqr;
                row.p80 = s.p80;
                row.p90 = s.p90;
            }
            Err(e) => row.error = Some(e.to_string()),
        }

        row
    }
}

#[derive(Debug, Serialize)]
pub struct ComparisonRow {
    pub city: String,
    pub year: i32,
    pub unfiltered_benchmark: Option<f64>,
    pub filtered_benchmark: Option<f64>,
    pub pct_difference: Option<f64>,
    pub error: Option<String>,
}

impl From<&SiteReport> for ComparisonRow {
    fn from(site: &SiteReport) -> Self {
        let benchmark = |v: View| site.view(v).and_then(ViewReport::benchmark_value);
        ComparisonRow {
            city: site.site.city.clone(),
            year: site.site.year,
            unfiltered_benchmark: benchmark(View::AllRecords),
            filtered_benchmark: benchmark(View::AccurateOnly),
            pct_difference: site.comparison.as_ref().ok().map(|c| c.pct_difference),
            error: site.comparison.as_ref().err().map(ToString::to_string),
        }
    }
}

/// Time-series row; `retained` is empty when no fences could be computed.
#[derive(Debug, Serialize)]
pub struct DailyPaceRow {
    pub date: NaiveDate,
    pub pace: f64,
    pub enumerators: usize,
    pub deliveries: usize,
    pub retained: Option<bool>,
}

pub fn daily_pace_rows(view: &ViewReport) -> Vec<DailyPaceRow> {
    let fences = view.benchmark.as_ref().ok().map(|b| b.outliers.fences);
    view.daily_pace
        .iter()
        .map(|d| DailyPaceRow {
            date: d.date,
            pace: d.pace,
            enumerators: d.enumerators,
            deliveries: d.deliveries,
            retained: fences.map(|f| f.contains(d.pace)),
        })
        .collect()
}

fn view_file(dir: &Path, site: &SiteReport, view: View, table: &str) -> PathBuf {
    dir.join(format!("{}_{}_{}.csv", table, site.site.slug(), view))
}

/// Writes the per-view tables of one site.
pub fn write_site_tables(dir: &Path, site: &SiteReport) -> Result<()> {
    for view in &site.views {
        write_rows(
            &view_file(dir, site, view.view, "daily_pace"),
            &daily_pace_rows(view),
        )?;
        if let Ok(b) = &view.benchmark {
            write_rows(&view_file(dir, site, view.view, "histogram"), &b.histogram)?;
        }
        let t = &view.temporal;
        write_rows(
            &view_file(dir, site, view.view, "temporal_time_of_day"),
            &t.by_time_of_day,
        )?;
        write_rows(
            &view_file(dir, site, view.view, "temporal_day_of_week"),
            &t.by_day_of_week,
        )?;
        write_rows(
            &view_file(dir, site, view.view, "temporal_cross"),
            &t.by_day_and_time,
        )?;
    }
    Ok(())
}

/// Writes every output of a run into `dir`, creating it if needed.
pub fn write_report(dir: &Path, sites: &[SiteReport]) -> Result<()> {
    fs::create_dir_all(dir)?;

    let summary: Vec<SummaryRow> = sites
        .iter()
        .flat_map(|s| s.views.iter().map(move |v| SummaryRow::from_view(s, v)))
        .collect();
    write_rows(&dir.join("summary.csv"), &summary)?;

    let comparison: Vec<ComparisonRow> = sites.iter().map(ComparisonRow::from).collect();
    write_rows(&dir.join("comparison.csv"), &comparison)?;

    for site in sites {
        write_site_tables(dir, site)?;
    }

    write_json(&dir.join("report.json"), &sites)?;

    info!(dir = %dir.display(), sites = sites.len(), "Report written");
    Ok(())
}
