//! CLI entry point for the delivery-pace benchmark tool.
//!
//! Provides subcommands for running the full pipeline over configured
//! sources, comparing two benchmarks, and auditing timestamp formats.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use delivery_pace::analyzers::analyzer::{RunSettings, analyze_all, analyze_source};
use delivery_pace::analyzers::comparison::compare;
use delivery_pace::config::{PipelineConfig, SiteId};
use delivery_pace::datetime::audit_formats;
use delivery_pace::ingest::load_source;
use delivery_pace::output::{print_json, write_report};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "delivery_pace")]
#[command(about = "Daily delivery-pace benchmarks from field delivery logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for every configured source and write reports
    Run {
        /// JSON file describing the sources
        #[arg(short, long, default_value = "sites.json")]
        config: String,

        /// Directory to write CSV tables and report.json into
        #[arg(short, long, default_value = "reports")]
        output_dir: String,

        /// Only run one source, given as CITY:YEAR (e.g. "Kenema:2024")
        #[arg(long)]
        site: Option<SiteId>,
    },
    /// Percentage difference between an unfiltered and a filtered benchmark
    Compare {
        unfiltered: f64,
        filtered: f64,
    },
    /// Report how many timestamps each candidate date format matched
    CheckDates {
        #[arg(short, long, default_value = "sites.json")]
        config: String,

        /// Source to audit, as CITY:YEAR
        #[arg(long)]
        site: SiteId,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/delivery_pace.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("delivery_pace.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            site,
        } => run(&config, &output_dir, site)?,
        Commands::Compare {
            unfiltered,
            filtered,
        } => {
            let comparison = compare(unfiltered, filtered)?;
            print_json(&comparison)?;
        }
        Commands::CheckDates { config, site } => check_dates(&config, &site)?,
    }

    Ok(())
}

/// Runs all configured sources (or one) and writes the report tables.
#[tracing::instrument(skip(site))]
fn run(config: &str, output_dir: &str, site: Option<SiteId>) -> Result<()> {
    let pipeline = PipelineConfig::load(config)?;
    info!(
        sources = pipeline.sources.len(),
        threshold_m = pipeline.accuracy_threshold_m,
        "Config loaded"
    );

    let reports = match site {
        Some(site) => {
            let source = pipeline
                .source(&site)
                .with_context(|| format!("site {} is not configured", site))?;
            vec![analyze_source(source, &RunSettings::from(&pipeline))?]
        }
        None => analyze_all(&pipeline),
    };

    if reports.is_empty() {
        bail!("no source could be analyzed");
    }

    for report in &reports {
        match &report.comparison {
            Ok(c) => info!(
                site = %report.site,
                unfiltered = c.unfiltered,
                filtered = c.filtered,
                pct_difference = c.pct_difference,
                "Benchmarks compared"
            ),
            Err(e) => warn!(site = %report.site, error = %e, "Benchmarks not comparable"),
        }
    }

    write_report(Path::new(output_dir), &reports)?;
    Ok(())
}

/// Audits which date formats match a source's timestamp column.
#[tracing::instrument(skip(config))]
fn check_dates(config: &str, site: &SiteId) -> Result<()> {
    let pipeline = PipelineConfig::load(config)?;
    let source = pipeline
        .source(site)
        .with_context(|| format!("site {} is not configured", site))?;

    let records = load_source(source)?;
    let audit = audit_formats(
        records.iter().map(|r| r.timestamp.as_deref()),
        &source.date_formats,
    );

    if audit.unparseable > 0 {
        error!(
            unparseable = audit.unparseable,
            samples = ?audit.samples,
            "Timestamps matched no format"
        );
    }
    print_json(&audit)?;
    Ok(())
}
