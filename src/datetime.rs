//! Timestamp parsing across inconsistent source encodings.
//!
//! Each source lists its candidate formats in priority order; the first one
//! that parses wins.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

const EXCEL_SERIAL_TOKEN: &str = "excel_serial";
/// Largest serial a spreadsheet accepts (9999-12-31).
const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;

/// One candidate encoding for a timestamp field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DateFormat {
    /// A chrono `strftime` pattern containing both date and time fields.
    Pattern(String),
    /// Spreadsheet serial day number, fractional part is the time of day.
    ExcelSerial,
}

impl From<String> for DateFormat {
    fn from(s: String) -> Self {
        if s.trim() == EXCEL_SERIAL_TOKEN {
            DateFormat::ExcelSerial
        } else {
            DateFormat::Pattern(s)
        }
    }
}

impl From<DateFormat> for String {
    fn from(f: DateFormat) -> Self {
        f.to_string()
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFormat::Pattern(p) => f.write_str(p),
            DateFormat::ExcelSerial => f.write_str(EXCEL_SERIAL_TOKEN),
        }
    }
}

impl DateFormat {
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        match self {
            DateFormat::Pattern(p) => NaiveDateTime::parse_from_str(raw, p).ok(),
            DateFormat::ExcelSerial => parse_excel_serial(raw),
        }
    }
}

fn parse_excel_serial(raw: &str) -> Option<NaiveDateTime> {
    let serial: f64 = raw.parse().ok()?;
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_SERIAL_MAX {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    base.checked_add_signed(Duration::days(days) + Duration::seconds(secs))
}

/// Outcome of parsing one raw timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampParse {
    /// Parsed by the format at `format_index` in the candidate list.
    Parsed {
        at: NaiveDateTime,
        format_index: usize,
    },
    /// Field was empty or absent; no format was tried.
    Missing,
    /// Every candidate format was tried and none matched.
    Unparseable,
}

/// Parses `raw` with the first matching format in `formats`.
pub fn parse_timestamp(raw: Option<&str>, formats: &[DateFormat]) -> TimestampParse {
    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() && !r.eq_ignore_ascii_case("na") => r,
        _ => return TimestampParse::Missing,
    };

    formats
        .iter()
        .enumerate()
        .find_map(|(format_index, f)| {
            f.parse(raw).map(|at| TimestampParse::Parsed { at, format_index })
        })
        .unwrap_or(TimestampParse::Unparseable)
}

/// How often each candidate format matched over a column of timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatAudit {
    /// `(format, matches)` in priority order.
    pub matched: Vec<(String, usize)>,
    pub missing: usize,
    pub unparseable: usize,
    /// A few raw values that failed, for eyeballing.
    pub samples: Vec<String>,
}

const AUDIT_SAMPLES: usize = 5;

pub fn audit_formats<'a, I>(raw: I, formats: &[DateFormat]) -> FormatAudit
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts = vec![0usize; formats.len()];
    let mut audit = FormatAudit {
        matched: Vec::new(),
        missing: 0,
        unparseable: 0,
        samples: Vec::new(),
    };

    for value in raw {
        match parse_timestamp(value, formats) {
            TimestampParse::Parsed { format_index, .. } => counts[format_index] += 1,
            TimestampParse::Missing => audit.missing += 1,
            TimestampParse::Unparseable => {
                audit.unparseable += 1;
                if audit.samples.len() < AUDIT_SAMPLES {
                    if let Some(v) = value {
                        audit.samples.push(v.to_string());
                    }
                }
            }
        }
    }

    audit.matched = formats.iter().map(ToString::to_string).zip(counts).collect();
    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn formats() -> Vec<DateFormat> {
        vec![
            DateFormat::from("%d/%m/%Y %H:%M:%S".to_string()),
            DateFormat::from("%m/%d/%Y %H:%M:%S".to_string()),
            DateFormat::from("%d/%m/%Y %H:%M".to_string()),
            DateFormat::from("%m/%d/%Y %H:%M".to_string()),
        ]
    }

    fn parsed(raw: &str) -> (NaiveDateTime, usize) {
        match parse_timestamp(Some(raw), &formats()) {
            TimestampParse::Parsed { at, format_index } => (at, format_index),
            other => panic!("expected parse for {raw}, got {other:?}"),
        }
    }

    #[test]
    fn test_day_first_wins_when_ambiguous() {
        let (at, idx) = parsed("03/04/2023 10:15:00");
        assert_eq!(idx, 0);
        assert_eq!(at.date(), NaiveDate::from_ymd_opt(2023, 4, 3).unwrap());
        assert_eq!(at.hour(), 10);
    }

    #[test]
    fn test_falls_back_to_month_first() {
        let (at, idx) = parsed("12/25/2023 16:40:09");
        assert_eq!(idx, 1);
        assert_eq!(at.date(), NaiveDate::from_ymd_opt(2023, 12, 25).unwrap());
    }

    #[test]
    fn test_without_seconds() {
        let (at, idx) = parsed("25/12/2023 07:05");
        assert_eq!(idx, 2);
        assert_eq!(at.month(), 12);
        assert_eq!(at.hour(), 7);

        let (_, idx) = parsed("12/25/2023 07:05");
        assert_eq!(idx, 3);
    }

    #[test]
    fn test_empty_is_missing_not_failure() {
        assert_eq!(parse_timestamp(None, &formats()), TimestampParse::Missing);
        assert_eq!(parse_timestamp(Some("  "), &formats()), TimestampParse::Missing);
        assert_eq!(parse_timestamp(Some("NA"), &formats()), TimestampParse::Missing);
    }

    #[test]
    fn test_garbage_is_unparseable() {
        assert_eq!(
            parse_timestamp(Some("yesterday"), &formats()),
            TimestampParse::Unparseable
        );
        assert_eq!(
            parse_timestamp(Some("2023-12-25"), &formats()),
            TimestampParse::Unparseable
        );
    }

    #[test]
    fn test_excel_serial() {
        let formats = vec![DateFormat::ExcelSerial];
        match parse_timestamp(Some("45291.5"), &formats) {
            TimestampParse::Parsed { at, .. } => {
                assert_eq!(at.date(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
                assert_eq!(at.hour(), 12);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            parse_timestamp(Some("-3"), &formats),
            TimestampParse::Unparseable
        );
    }

    #[test]
    fn test_format_serde_token() {
        let f: Vec<DateFormat> =
            serde_json::from_str(r#"["excel_serial", "%Y-%m-%d %H:%M:%S"]"#).unwrap();
        assert_eq!(f[0], DateFormat::ExcelSerial);
        assert_eq!(f[1], DateFormat::Pattern("%Y-%m-%d %H:%M:%S".into()));
        assert_eq!(serde_json::to_string(&f[0]).unwrap(), "\"excel_serial\"");
    }

    #[test]
    fn test_audit_counts_per_format() {
        let raw = [
            Some("01/02/2024 10:00:00"),
            Some("01/13/2024 10:00:00"),
            Some("01/02/2024 10:00"),
            None,
            Some("bad"),
        ];
        let audit = audit_formats(raw, &formats());
        assert_eq!(audit.matched[0].1, 1);
        assert_eq!(audit.matched[1].1, 1);
        assert_eq!(audit.matched[2].1, 1);
        assert_eq!(audit.matched[3].1, 0);
        assert_eq!(audit.matched[0].0, "%d/%m/%Y %H:%M:%S");
        assert_eq!(audit.missing, 1);
        assert_eq!(audit.unparseable, 1);
        assert_eq!(audit.samples, vec!["bad".to_string()]);
    }
}
