//! Per-source configuration.
//!
//! Every city/year extract is described by a [`SourceConfig`] instead of its
//! own code path. The whole set is stored as a JSON file:
//! ```json
//! {
//!   "accuracy_threshold_m": 80.0,
//!   "sources": [
//!     {
//!       "city": "Kenema",
//!       "year": 2024,
//!       "files": ["data/kenema_2024_team_a.csv", "data/kenema_2024_team_b.csv"],
//!       "columns": {
//!         "enumerator": "full_name",
//!         "timestamp": "delivery_date",
//!         "distance": "distance_km",
//!         "property_type": "property_type"
//!       },
//!       "distance_unit": "kilometers",
//!       "date_formats": ["%d/%m/%Y %H:%M:%S", "%m/%d/%Y %H:%M:%S"],
//!       "property_type_delimiter": ";"
//!     }
//!   ]
//! }
//! ```

use crate::accuracy::DistanceUnit;
use crate::datetime::DateFormat;
use crate::error::{PaceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_ACCURACY_THRESHOLD_M: f64 = 80.0;
pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

fn default_threshold() -> f64 {
    DEFAULT_ACCURACY_THRESHOLD_M
}

fn default_bins() -> usize {
    DEFAULT_HISTOGRAM_BINS
}

/// Identifies one pipeline instance: a city in a given year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId {
    pub city: String,
    pub year: i32,
}

impl SiteId {
    pub fn new(city: &str, year: i32) -> Self {
        Self {
            city: city.to_string(),
            year,
        }
    }

    /// Lowercase, underscore-separated form used in output file names.
    pub fn slug(&self) -> String {
        let city: String = self
            .city
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_{}", city, self.year)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.city, self.year)
    }
}

impl std::str::FromStr for SiteId {
    type Err = PaceError;

    /// Parses `CITY:YEAR`, e.g. `Kenema:2024`.
    fn from_str(s: &str) -> Result<Self> {
        let (city, year) = s
            .rsplit_once(':')
            .ok_or_else(|| PaceError::Config(format!("expected CITY:YEAR, got '{}'", s)))?;
        let year = year
            .trim()
            .parse::<i32>()
            .map_err(|_| PaceError::Config(format!("invalid year in '{}'", s)))?;
        if city.trim().is_empty() {
            return Err(PaceError::Config(format!("missing city in '{}'", s)));
        }
        Ok(Self::new(city.trim(), year))
    }
}

/// Maps canonical field names onto the column headers of one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMap {
    pub enumerator: String,
    pub timestamp: String,
    pub distance: String,
    #[serde(default)]
    pub property_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub city: String,
    pub year: i32,
    pub files: Vec<PathBuf>,
    pub columns: ColumnMap,
    pub distance_unit: DistanceUnit,
    pub date_formats: Vec<DateFormat>,
    #[serde(default)]
    pub property_type_delimiter: Option<String>,
}

impl SourceConfig {
    pub fn site(&self) -> SiteId {
        SiteId::new(&self.city, self.year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_threshold")]
    pub accuracy_threshold_m: f64,
    #[serde(default = "default_bins")]
    pub histogram_bins: usize,
    pub sources: Vec<SourceConfig>,
}

impl PipelineConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PaceError::Config(format!("failed to read config file '{}': {}", path, e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(PaceError::Config("no sources configured".into()));
        }
        if !(self.accuracy_threshold_m > 0.0) {
            return Err(PaceError::Config(format!(
                "accuracy_threshold_m must be positive, got {}",
                self.accuracy_threshold_m
            )));
        }
        if self.histogram_bins == 0 {
            return Err(PaceError::Config("histogram_bins must be at least 1".into()));
        }
        for source in &self.sources {
            if source.files.is_empty() {
                return Err(PaceError::Config(format!("{}: no input files", source.site())));
            }
            if source.date_formats.is_empty() {
                return Err(PaceError::Config(format!(
                    "{}: no date formats",
                    source.site()
                )));
            }
            if let Some(d) = &source.property_type_delimiter {
                if d.is_empty() {
                    return Err(PaceError::Config(format!(
                        "{}: empty property_type_delimiter",
                        source.site()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the source for `site`, if configured.
    pub fn source(&self, site: &SiteId) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| {
            s.year == site.year && s.city.eq_ignore_ascii_case(site.city.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "sources": [{
            "city": "Freetown",
            "year": 2023,
            "files": ["a.csv"],
            "columns": {"enumerator": "user_name", "timestamp": "date", "distance": "dist_m"},
            "distance_unit": "meters",
            "date_formats": ["%d/%m/%Y %H:%M", "excel_serial"]
        }]
    }"#;

    #[test]
    fn test_load_applies_defaults() {
        let config = PipelineConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.accuracy_threshold_m, 80.0);
        assert_eq!(config.histogram_bins, 10);
        let source = &config.sources[0];
        assert_eq!(source.distance_unit, DistanceUnit::Meters);
        assert!(source.columns.property_type.is_none());
        assert_eq!(source.date_formats[1], DateFormat::ExcelSerial);
    }

    #[test]
    fn test_rejects_empty_sources() {
        let result = PipelineConfig::from_json(r#"{"sources": []}"#);
        assert!(matches!(result, Err(PaceError::Config(_))));
    }

    #[test]
    fn test_rejects_source_without_formats() {
        let json = SAMPLE.replace(r#"["%d/%m/%Y %H:%M", "excel_serial"]"#, "[]");
        let result = PipelineConfig::from_json(&json);
        assert!(matches!(result, Err(PaceError::Config(_))));
    }

    #[test]
    fn test_site_id_parse_and_lookup() {
        let config = PipelineConfig::from_json(SAMPLE).unwrap();
        let site: SiteId = "freetown:2023".parse().unwrap();
        assert!(config.source(&site).is_some());
        assert!("Freetown".parse::<SiteId>().is_err());
        assert!("Freetown:20x3".parse::<SiteId>().is_err());
    }

    #[test]
    fn test_site_slug() {
        assert_eq!(SiteId::new("Port Loko", 2022).slug(), "port_loko_2022");
    }
}
