//! Delivery records before and after normalization.

use crate::accuracy::{AccuracyFilter, DistanceUnit, View};
use crate::datetime::{DateFormat, TimestampParse, parse_timestamp};
use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// One logical delivery as read from a source, after property-type expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub enumerator: Option<String>,
    pub timestamp: Option<String>,
    /// Distance to target in the source's own unit.
    pub distance: Option<f64>,
    pub property_type: Option<String>,
    /// Some cell held bytes that were not valid UTF-8 and was decoded lossily.
    pub invalid_utf8: bool,
}

/// Three-hour working window a delivery falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TimeBracket {
    #[serde(rename = "06-09")]
    EarlyMorning,
    #[serde(rename = "09-12")]
    LateMorning,
    #[serde(rename = "12-15")]
    EarlyAfternoon,
    #[serde(rename = "15-18")]
    LateAfternoon,
    #[serde(rename = "Other")]
    Other,
}

impl TimeBracket {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=8 => TimeBracket::EarlyMorning,
            9..=11 => TimeBracket::LateMorning,
            12..=14 => TimeBracket::EarlyAfternoon,
            15..=17 => TimeBracket::LateAfternoon,
            _ => TimeBracket::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeBracket::EarlyMorning => "06-09",
            TimeBracket::LateMorning => "09-12",
            TimeBracket::EarlyAfternoon => "12-15",
            TimeBracket::LateAfternoon => "15-18",
            TimeBracket::Other => "Other",
        }
    }
}

impl fmt::Display for TimeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub enumerator: String,
    pub date: NaiveDate,
    pub hour: u32,
    pub weekday: Weekday,
    pub bracket: TimeBracket,
    pub distance_m: Option<f64>,
    pub property_type: Option<String>,
    pub accurate: bool,
}

impl NormalizedRecord {
    pub fn in_view(&self, view: View) -> bool {
        view.includes(self.accurate)
    }
}

/// Why a record was excluded during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordIssue {
    /// A required field was empty; parsing was not attempted.
    MissingField(&'static str),
    /// The timestamp was present but matched no candidate format.
    ParseFailure,
}

/// Counts kept for data-quality auditing of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub records_in: usize,
    pub records_kept: usize,
    pub missing_enumerator: usize,
    pub missing_timestamp: usize,
    pub unparseable_timestamp: usize,
    /// Kept records whose distance was absent or non-numeric.
    pub missing_distance: usize,
    pub accurate: usize,
    /// Records read from rows with non-UTF-8 bytes, kept with replacement
    /// characters.
    pub invalid_utf8: usize,
}

impl DataQuality {
    pub fn dropped(&self) -> usize {
        self.records_in - self.records_kept
    }

    fn record(&mut self, issue: RecordIssue) {
        match issue {
            RecordIssue::MissingField("enumerator") => self.missing_enumerator += 1,
            RecordIssue::MissingField(_) => self.missing_timestamp += 1,
            RecordIssue::ParseFailure => self.unparseable_timestamp += 1,
        }
    }
}

/// Parses and classifies a single record.
pub fn normalize_record(
    record: &DeliveryRecord,
    formats: &[DateFormat],
    unit: DistanceUnit,
    filter: &AccuracyFilter,
) -> Result<NormalizedRecord, RecordIssue> {
    let enumerator = match record.enumerator.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => e.to_string(),
        _ => return Err(RecordIssue::MissingField("enumerator")),
    };

    let at = match parse_timestamp(record.timestamp.as_deref(), formats) {
        TimestampParse::Parsed { at, .. } => at,
        TimestampParse::Missing => return Err(RecordIssue::MissingField("timestamp")),
        TimestampParse::Unparseable => return Err(RecordIssue::ParseFailure),
    };

    let distance_m = record
        .distance
        .filter(|d| d.is_finite())
        .map(|d| unit.to_meters(d));

    Ok(NormalizedRecord {
        enumerator,
        date: at.date(),
        hour: at.hour(),
        weekday: at.weekday(),
        bracket: TimeBracket::from_hour(at.hour()),
        accurate: filter.is_accurate(distance_m),
        distance_m,
        property_type: record.property_type.clone(),
    })
}

/// Normalizes a batch, dropping records that fail and counting why.
pub fn normalize_records(
    records: &[DeliveryRecord],
    formats: &[DateFormat],
    unit: DistanceUnit,
    filter: &AccuracyFilter,
) -> (Vec<NormalizedRecord>, DataQuality) {
    let mut quality = DataQuality {
        records_in: records.len(),
        ..Default::default()
    };
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        if record.invalid_utf8 {
            quality.invalid_utf8 += 1;
        }
        match normalize_record(record, formats, unit, filter) {
            Ok(n) => {
                if n.distance_m.is_none() {
                    quality.missing_distance += 1;
                }
                if n.accurate {
                    quality.accurate += 1;
                }
                kept.push(n);
            }
            Err(issue) => {
                if issue == RecordIssue::ParseFailure {
                    debug!(raw = ?record.timestamp, "Timestamp matched no candidate format");
                }
                quality.record(issue);
            }
        }
    }

    quality.records_kept = kept.len();

    if quality.unparseable_timestamp > 0 {
        warn!(
            unparseable = quality.unparseable_timestamp,
            records_in = quality.records_in,
            "Records dropped: timestamp parse failure"
        );
    }
    if quality.missing_timestamp + quality.missing_enumerator > 0 {
        debug!(
            missing_timestamp = quality.missing_timestamp,
            missing_enumerator = quality.missing_enumerator,
            "Records dropped: required field missing"
        );
    }

    (kept, quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<DateFormat> {
        vec![DateFormat::Pattern("%d/%m/%Y %H:%M".into())]
    }

    fn record(
        enumerator: Option<&str>,
        ts: Option<&str>,
        distance: Option<f64>,
    ) -> DeliveryRecord {
        DeliveryRecord {
            enumerator: enumerator.map(String::from),
            timestamp: ts.map(String::from),
            distance,
            property_type: None,
            invalid_utf8: false,
        }
    }

    #[test]
    fn test_time_brackets() {
        assert_eq!(TimeBracket::from_hour(5), TimeBracket::Other);
        assert_eq!(TimeBracket::from_hour(6), TimeBracket::EarlyMorning);
        assert_eq!(TimeBracket::from_hour(8), TimeBracket::EarlyMorning);
        assert_eq!(TimeBracket::from_hour(9), TimeBracket::LateMorning);
        assert_eq!(TimeBracket::from_hour(12), TimeBracket::EarlyAfternoon);
        assert_eq!(TimeBracket::from_hour(15), TimeBracket::LateAfternoon);
        assert_eq!(TimeBracket::from_hour(17), TimeBracket::LateAfternoon);
        assert_eq!(TimeBracket::from_hour(18), TimeBracket::Other);
        assert_eq!(TimeBracket::from_hour(0), TimeBracket::Other);
    }

    #[test]
    fn test_normalize_derives_fields() {
        let r = record(Some(" alice "), Some("06/03/2024 14:20"), Some(0.05));
        let n = normalize_record(
            &r,
            &formats(),
            DistanceUnit::Kilometers,
            &AccuracyFilter::default(),
        )
        .unwrap();
        assert_eq!(n.enumerator, "alice");
        assert_eq!(n.date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert_eq!(n.weekday, Weekday::Wed);
        assert_eq!(n.hour, 14);
        assert_eq!(n.bracket, TimeBracket::EarlyAfternoon);
        assert!(n.accurate);
        assert!((n.distance_m.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_counts_each_issue() {
        let records = vec![
            record(Some("a"), Some("01/02/2024 10:00"), Some(10.0)),
            record(Some("a"), Some("01/02/2024 11:00"), Some(200.0)),
            record(Some("a"), Some("01/02/2024 11:30"), None),
            record(Some("a"), None, Some(10.0)),
            record(Some("a"), Some("2024-02-01"), Some(10.0)),
            record(None, Some("01/02/2024 10:00"), Some(10.0)),
        ];
        let (kept, q) = normalize_records(
            &records,
            &formats(),
            DistanceUnit::Meters,
            &AccuracyFilter::default(),
        );
        assert_eq!(kept.len(), 3);
        assert_eq!(q.records_in, 6);
        assert_eq!(q.records_kept, 3);
        assert_eq!(q.dropped(), 3);
        assert_eq!(q.missing_timestamp, 1);
        assert_eq!(q.unparseable_timestamp, 1);
        assert_eq!(q.missing_enumerator, 1);
        assert_eq!(q.missing_distance, 1);
        assert_eq!(q.accurate, 1);
    }

    #[test]
    fn test_lossily_decoded_records_are_counted() {
        let mut latin1 = record(Some("Cont\u{FFFD}"), Some("01/02/2024 10:00"), Some(10.0));
        latin1.invalid_utf8 = true;
        let records = vec![latin1, record(Some("a"), Some("01/02/2024 10:30"), Some(10.0))];
        let (kept, q) = normalize_records(
            &records,
            &formats(),
            DistanceUnit::Meters,
            &AccuracyFilter::default(),
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(q.invalid_utf8, 1);
        assert_eq!(q.dropped(), 0);
    }
}
