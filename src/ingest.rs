//! Reads delivery extracts into [`DeliveryRecord`]s.
//!
//! Column names come from the source's [`ColumnMap`]; `.gz` files are
//! decompressed on the fly.

use crate::config::{ColumnMap, SourceConfig};
use crate::error::{PaceError, Result};
use crate::records::DeliveryRecord;
use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Header positions of the mapped columns in one file.
struct ColumnIndex {
    enumerator: usize,
    timestamp: usize,
    distance: usize,
    property_type: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &ColumnMap, file: &str) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| PaceError::MissingColumn {
                    column: name.to_string(),
                    file: file.to_string(),
                })
        };

        Ok(Self {
            enumerator: find(&columns.enumerator)?,
            timestamp: find(&columns.timestamp)?,
            distance: find(&columns.distance)?,
            property_type: columns.property_type.as_deref().map(find).transpose()?,
        })
    }
}

/// Decodes a cell, replacing bytes that are not valid UTF-8.
fn field(row: &ByteRecord, idx: usize) -> Option<String> {
    row.get(idx)
        .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
        .filter(|s| !s.is_empty())
}

fn has_invalid_utf8(row: &ByteRecord) -> bool {
    row.iter().any(|raw| std::str::from_utf8(raw).is_err())
}

/// Parses a numeric cell; blanks, `NA` and text are treated as missing.
pub fn parse_distance(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite())
}

/// Splits a multi-valued property-type field into one record per value.
/// Blank segments are ignored; an empty field still yields one record.
pub fn expand_property_types(
    record: DeliveryRecord,
    delimiter: Option<&str>,
) -> Vec<DeliveryRecord> {
    let (Some(delim), Some(tags)) = (delimiter, record.property_type.as_deref()) else {
        return vec![record];
    };

    let values: Vec<String> = tags
        .split(delim)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();

    if values.len() <= 1 {
        return vec![DeliveryRecord {
            property_type: values.into_iter().next(),
            ..record
        }];
    }

    values
        .into_iter()
        .map(|tag| DeliveryRecord {
            property_type: Some(tag),
            ..record.clone()
        })
        .collect()
}

/// Reads CSV rows from `reader` using the given column mapping. Cells that
/// are not valid UTF-8 (e.g. Latin-1 spreadsheet exports) are decoded
/// lossily and the record is flagged rather than failing the file.
pub fn read_records<R: Read>(
    reader: R,
    columns: &ColumnMap,
    delimiter: Option<&str>,
    file: &str,
) -> Result<Vec<DeliveryRecord>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = StringRecord::from_byte_record_lossy(rdr.byte_headers()?.clone());
    let index = ColumnIndex::resolve(&headers, columns, file)?;
    let mut records = Vec::new();
    let mut rows = 0usize;
    let mut invalid_rows = 0usize;

    for result in rdr.byte_records() {
        let row = result?;
        rows += 1;
        let invalid_utf8 = has_invalid_utf8(&row);
        if invalid_utf8 {
            invalid_rows += 1;
        }
        let record = DeliveryRecord {
            enumerator: field(&row, index.enumerator),
            timestamp: field(&row, index.timestamp),
            distance: parse_distance(field(&row, index.distance).as_deref()),
            property_type: index.property_type.and_then(|i| field(&row, i)),
            invalid_utf8,
        };
        records.extend(expand_property_types(record, delimiter));
    }

    if invalid_rows > 0 {
        warn!(file, rows = invalid_rows, "Rows with invalid UTF-8 decoded lossily");
    }
    debug!(file, rows, records = records.len(), "CSV file read");
    Ok(records)
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Reads every file of a source (e.g. one per team split) into one dataset.
#[tracing::instrument(skip(source), fields(city = %source.city, year = source.year))]
pub fn load_source(source: &SourceConfig) -> Result<Vec<DeliveryRecord>> {
    let mut records = Vec::new();

    for path in &source.files {
        let label = path.display().to_string();
        let reader = open(path)?;
        records.extend(read_records(
            reader,
            &source.columns,
            source.property_type_delimiter.as_deref(),
            &label,
        )?);
    }

    info!(files = source.files.len(), records = records.len(), "Source loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::fs;
    use std::io::Write;

    fn columns(property_type: Option<&str>) -> ColumnMap {
        ColumnMap {
            enumerator: "user_name".into(),
            timestamp: "Delivery Date".into(),
            distance: "distance".into(),
            property_type: property_type.map(String::from),
        }
    }

    const CSV: &str = "\
id,User_Name,Delivery Date,distance,ptype
1,alice,01/02/2024 10:00,12.5,res
2,bob,01/02/2024 11:00,NA,res;com
3,,01/02/2024 12:00,5,
";

    #[test]
    fn test_read_maps_columns_case_insensitively() {
        let records = read_records(CSV.as_bytes(), &columns(None), None, "mem").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].enumerator.as_deref(), Some("alice"));
        assert_eq!(records[0].timestamp.as_deref(), Some("01/02/2024 10:00"));
        assert_eq!(records[0].distance, Some(12.5));
        assert_eq!(records[1].distance, None);
        assert_eq!(records[2].enumerator, None);
    }

    #[test]
    fn test_read_expands_property_types() {
        let records =
            read_records(CSV.as_bytes(), &columns(Some("ptype")), Some(";"), "mem").unwrap();
        assert_eq!(records.len(), 4);
        let bob: Vec<_> = records
            .iter()
            .filter(|r| r.enumerator.as_deref() == Some("bob"))
            .map(|r| r.property_type.clone().unwrap())
            .collect();
        assert_eq!(bob, vec!["res", "com"]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let mut cols = columns(None);
        cols.distance = "dist_km".into();
        let err = read_records(CSV.as_bytes(), &cols, None, "mem").unwrap_err();
        assert!(matches!(err, PaceError::MissingColumn { ref column, .. } if column == "dist_km"));
    }

    #[test]
    fn test_expand_ignores_blank_segments() {
        let record = DeliveryRecord {
            enumerator: Some("a".into()),
            timestamp: None,
            distance: None,
            property_type: Some("res; ;".into()),
            invalid_utf8: false,
        };
        let out = expand_property_types(record, Some(";"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].property_type.as_deref(), Some("res"));
    }

    #[test]
    fn test_latin1_row_is_kept() {
        let mut bytes = b"user_name,Delivery Date,distance\n".to_vec();
        bytes.extend_from_slice(b"alice,2022-05-02 09:00,10\n");
        bytes.extend_from_slice(b"Cont\xe9,2022-05-02 09:30,10\n");
        bytes.extend_from_slice(b"bob,2022-05-02 10:00,12\n");

        let records = read_records(bytes.as_slice(), &columns(None), None, "mem").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].enumerator.as_deref(), Some("Cont\u{FFFD}"));
        assert_eq!(records[1].distance, Some(10.0));
        assert!(records[1].invalid_utf8);
        assert!(!records[0].invalid_utf8);
        assert!(!records[2].invalid_utf8);
    }

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance(Some(" 0.08 ")), Some(0.08));
        assert_eq!(parse_distance(Some("NA")), None);
        assert_eq!(parse_distance(Some("")), None);
        assert_eq!(parse_distance(None), None);
    }

    #[test]
    fn test_load_source_reads_gzip() {
        let path = env::temp_dir().join("delivery_pace_test_ingest.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(CSV.as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let source = SourceConfig {
            city: "Makeni".into(),
            year: 2023,
            files: vec![path.clone()],
            columns: columns(None),
            distance_unit: crate::accuracy::DistanceUnit::Meters,
            date_formats: vec![],
            property_type_delimiter: None,
        };
        let records = load_source(&source).unwrap();
        assert_eq!(records.len(), 3);

        fs::remove_file(&path).unwrap();
    }
}
