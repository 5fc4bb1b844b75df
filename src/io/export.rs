//! CSV export for annotated records and savings pivots.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::data::parser::TIMESTAMP_FORMAT;
use crate::engine::savings::PivotResult;
use crate::engine::types::{AnalysisRecord, GroupStat};

/// Column header for annotated record export.
const RECORD_HEADER: &str = "row,timestamp,kw_sum,kw_sum_average,temp_out,temp_gate,\
                             delta_t,delta_t_rounded,temp_out_rounded,temp_gate_rounded,\
                             installation";

/// Column header for pivot export.
const PIVOT_HEADER: &str = "bucket,avg_kwh_pre,count_pre,avg_kwh_post,count_post";

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

fn stat_cells(stat: Option<GroupStat>) -> [String; 2] {
    match stat {
        Some(s) => [format!("{:.4}", s.mean_kw), s.count.to_string()],
        None => [String::new(), String::new()],
    }
}

/// Exports annotated records to a CSV file at the given path.
///
/// Null values are written as empty cells. Produces deterministic output
/// for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_records(records: &[AnalysisRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_records(records, io::BufWriter::new(file))
}

/// Writes annotated records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_records(records: &[AnalysisRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(RECORD_HEADER.split(',').map(str::trim))?;

    for r in records {
        let t = &r.temperature;
        wtr.write_record(&[
            r.row.to_string(),
            r.timestamp
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            format!("{:.4}", r.kw_sum),
            opt(r.kw_sum_average),
            opt(r.temp_out),
            opt(r.temp_gate),
            opt(t.delta_t),
            opt(t.delta_t_rounded),
            opt(t.temp_out_rounded),
            opt(t.temp_gate_rounded),
            r.installation.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a pivot to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_pivot(pivot: &PivotResult, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_pivot(pivot, io::BufWriter::new(file))
}

/// Writes a pivot as CSV to any writer, one row per bucket in ascending
/// order. A missing class leaves its two cells empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_pivot(pivot: &PivotResult, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(PIVOT_HEADER.split(','))?;

    for row in pivot.rows() {
        let [pre_mean, pre_count] = stat_cells(row.pre);
        let [post_mean, post_count] = stat_cells(row.post);
        wtr.write_record(&[
            row.bucket.to_string(),
            pre_mean,
            pre_count,
            post_mean,
            post_count,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
