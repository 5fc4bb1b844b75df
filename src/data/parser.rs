//! Raw record parser: tabular CSV input to a typed [`Dataset`].

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use super::record::{Dataset, Record, Schema};
use crate::error::{ConfigurationError, DataError};

/// Name of the mandatory timestamp column.
pub const TIME_STAMP: &str = "TIME_STAMP";
/// Timestamp layout of the raw table.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";
/// Prefix identifying circuit columns.
pub const CIRCUIT_PREFIX: &str = "C_";

pub const TEMP_OUT: &str = "TEMP_OUT";
pub const TEMP_GATE: &str = "TEMP_GATE";
pub const HUMID_OUT: &str = "HUMID_OUT";
pub const HUMID_GATE: &str = "HUMID_GATE";

/// Column positions resolved from the header row.
struct ColumnMap {
    time_stamp: usize,
    circuits: Vec<usize>,
    temp_out: Option<usize>,
    temp_gate: Option<usize>,
    humid_out: Option<usize>,
    humid_gate: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<(Self, Schema), ConfigurationError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let time_stamp = find(TIME_STAMP).ok_or_else(|| ConfigurationError::MissingColumn {
            column: TIME_STAMP.to_string(),
        })?;

        let mut circuits = Vec::new();
        let mut circuit_names = Vec::new();
        for (i, h) in headers.iter().enumerate() {
            let h = h.trim();
            if h.starts_with(CIRCUIT_PREFIX) {
                circuits.push(i);
                circuit_names.push(h.to_string());
            }
        }

        let map = Self {
            time_stamp,
            circuits,
            temp_out: find(TEMP_OUT),
            temp_gate: find(TEMP_GATE),
            humid_out: find(HUMID_OUT),
            humid_gate: find(HUMID_GATE),
        };
        let schema = Schema {
            circuits: circuit_names,
            has_temp_out: map.temp_out.is_some(),
            has_temp_gate: map.temp_gate.is_some(),
            has_humidity: map.humid_out.is_some() || map.humid_gate.is_some(),
        };
        Ok((map, schema))
    }
}

/// Parses a timestamp cell; anything that does not match yields `None`.
pub fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(cell.trim(), TIMESTAMP_FORMAT).ok()
}

/// Parses a numeric cell. Empty, unparsable and NaN cells are all `None`.
fn parse_number(cell: Option<&str>) -> Option<f64> {
    let v: f64 = cell?.trim().parse().ok()?;
    if v.is_nan() { None } else { Some(v) }
}

/// Reads the raw table from a CSV file.
///
/// # Errors
///
/// Returns `DataError::Io` if the file cannot be opened, and the errors of
/// [`parse_reader`] otherwise.
pub fn parse_path(path: &Path) -> Result<Dataset, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_reader(io::BufReader::new(file))
}

/// Reads the raw table from any CSV source.
///
/// Rows whose `TIME_STAMP` does not parse are kept with a null timestamp and
/// null derived fields. Short rows are tolerated; missing cells read as null.
///
/// # Errors
///
/// Returns `ConfigurationError::MissingColumn` (wrapped) when the header has
/// no `TIME_STAMP` column, or `DataError::Csv` when the input is not valid CSV.
pub fn parse_reader<R: Read>(reader: R) -> Result<Dataset, DataError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let (cols, schema) = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let raw = result?;
        let raw_ts = raw.get(cols.time_stamp).unwrap_or("").to_string();
        let timestamp = parse_timestamp(&raw_ts);

        let mut record = Record::new(row, raw_ts, timestamp);
        record.circuits = cols.circuits.iter().map(|&i| parse_number(raw.get(i))).collect();
        record.temp_out = cols.temp_out.and_then(|i| parse_number(raw.get(i)));
        record.temp_gate = cols.temp_gate.and_then(|i| parse_number(raw.get(i)));
        record.humid_out = cols.humid_out.and_then(|i| parse_number(raw.get(i)));
        record.humid_gate = cols.humid_gate.and_then(|i| parse_number(raw.get(i)));
        records.push(record);
    }

    let dataset = Dataset::new(schema, records);
    let unparsed = dataset.unparsed_timestamps();
    if unparsed > 0 {
        warn!(
            rows = unparsed,
            "timestamps did not match {TIMESTAMP_FORMAT}; derived fields left null"
        );
    }
    debug!(
        rows = dataset.len(),
        circuits = dataset.schema().circuits.len(),
        "parsed raw dataset"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
TIME_STAMP,C_1,C_2,TEMP_OUT,TEMP_GATE,HUMID_OUT
01/15/2024 08:00:00,1.5,2.0,10.0,4.0,40
01/15/2024 09:00:00,,3.0,NaN,4.5,41
garbage,1.0,1.0,9.0,3.0,42
";

    #[test]
    fn parses_schema_and_values() {
        let ds = parse_reader(SAMPLE.as_bytes()).expect("sample should parse");
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.schema().circuits, vec!["C_1", "C_2"]);
        assert!(ds.schema().has_temp_out && ds.schema().has_humidity);

        let first = &ds.records()[0];
        assert_eq!(first.circuits, vec![Some(1.5), Some(2.0)]);
        assert_eq!(first.temp_out, Some(10.0));
        assert_eq!(first.time.map(|t| t.hour), Some(8));
        assert_eq!(first.humid_out, Some(40.0));
    }

    #[test]
    fn empty_and_nan_cells_are_null() {
        let ds = parse_reader(SAMPLE.as_bytes()).unwrap();
        let second = &ds.records()[1];
        assert_eq!(second.circuits[0], None);
        assert_eq!(second.temp_out, None);
        assert_eq!(second.temp_gate, Some(4.5));
    }

    #[test]
    fn unparsable_timestamp_keeps_row() {
        let ds = parse_reader(SAMPLE.as_bytes()).unwrap();
        let third = &ds.records()[2];
        assert_eq!(third.raw_timestamp, "garbage");
        assert!(third.timestamp.is_none());
        assert!(third.time.is_none());
        assert_eq!(third.circuits, vec![Some(1.0), Some(1.0)]);
        assert_eq!(ds.unparsed_timestamps(), 1);
    }

    #[test]
    fn missing_time_stamp_column_is_fatal() {
        let err = parse_reader("C_1,TEMP_OUT\n1.0,2.0\n".as_bytes()).err();
        match err {
            Some(DataError::Configuration(ConfigurationError::MissingColumn { column })) => {
                assert_eq!(column, "TIME_STAMP");
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn optional_sensor_columns_may_be_absent() {
        let ds = parse_reader("TIME_STAMP,C_7\n03/01/2024 00:00:00,4\n".as_bytes()).unwrap();
        assert!(!ds.schema().has_temp_out);
        assert_eq!(ds.records()[0].temp_out, None);
        assert_eq!(ds.records()[0].circuits, vec![Some(4.0)]);
    }
}
