//! Typed time-series records and the dataset that holds them.

use std::collections::BTreeSet;

use chrono::{Datelike, Month, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

/// Calendar fields derived once from a record's timestamp.
///
/// Only exists for records whose timestamp parsed; an unparsable timestamp
/// leaves every derived field null at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeParts {
    /// Hour of day, 0–23.
    pub hour: u32,
    /// Day of week.
    pub weekday: Weekday,
    /// Calendar date of the sample.
    pub date: NaiveDate,
    /// Day of month, 1–31.
    pub day: u32,
    /// Month of year.
    pub month: Month,
}

impl TimeParts {
    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        let date = ts.date();
        Self {
            hour: ts.hour(),
            weekday: date.weekday(),
            date,
            day: date.day(),
            // month() is always 1..=12 for a valid NaiveDate
            month: Month::try_from(date.month() as u8).unwrap_or(Month::January),
        }
    }

    /// Full English weekday name, e.g. `"Monday"`.
    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }

    /// Full English month name, e.g. `"January"`.
    pub fn month_name(&self) -> &'static str {
        self.month.name()
    }
}

/// Full English name for a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One sampled observation from the raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Position of the row in the raw table (0-based, header excluded).
    pub row: usize,
    /// Raw `TIME_STAMP` cell as read.
    pub raw_timestamp: String,
    /// Parsed timestamp, `None` when the cell did not match `MM/DD/YYYY HH:MM:SS`.
    pub timestamp: Option<NaiveDateTime>,
    /// Derived calendar fields, `None` exactly when `timestamp` is `None`.
    pub time: Option<TimeParts>,
    /// Circuit readings aligned with [`Schema::circuits`].
    pub circuits: Vec<Option<f64>>,
    pub temp_out: Option<f64>,
    pub temp_gate: Option<f64>,
    pub humid_out: Option<f64>,
    pub humid_gate: Option<f64>,
}

impl Record {
    /// Builds a record and derives its calendar fields.
    pub fn new(row: usize, raw_timestamp: String, timestamp: Option<NaiveDateTime>) -> Self {
        Self {
            row,
            raw_timestamp,
            time: timestamp.as_ref().map(TimeParts::from_timestamp),
            timestamp,
            circuits: Vec::new(),
            temp_out: None,
            temp_gate: None,
            humid_out: None,
            humid_gate: None,
        }
    }
}

/// Column layout shared by every record of a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// `C_`-prefixed circuit column names in table order.
    pub circuits: Vec<String>,
    pub has_temp_out: bool,
    pub has_temp_gate: bool,
    pub has_humidity: bool,
}

impl Schema {
    /// Position of a circuit column, if the dataset has it.
    pub fn circuit_index(&self, name: &str) -> Option<usize> {
        self.circuits.iter().position(|c| c == name)
    }
}

/// An ordered, immutable set of records sharing one schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a new dataset with the same schema holding only the records
    /// accepted by `keep`, in their original order.
    pub fn retain_where<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Record) -> bool,
    {
        Dataset {
            schema: self.schema.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Number of records whose timestamp could not be parsed.
    pub fn unparsed_timestamps(&self) -> usize {
        self.records.iter().filter(|r| r.timestamp.is_none()).count()
    }

    /// Distinct values of each exclusion dimension present in the dataset.
    pub fn exclusion_options(&self) -> ExclusionOptions {
        let mut opts = ExclusionOptions::default();
        for t in self.records.iter().filter_map(|r| r.time.as_ref()) {
            opts.hours.insert(t.hour);
            opts.days.insert(t.day);
            opts.months.insert(t.month.number_from_month());
            opts.weekdays.insert(t.weekday.num_days_from_monday());
            opts.dates.insert(t.date);
        }
        opts
    }
}

/// Selectable values for each exclusion dimension, sorted.
///
/// Months are stored as 1–12 and weekdays as 0 (Monday) – 6 (Sunday) so the
/// sets sort chronologically; use the accessor methods for names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionOptions {
    pub hours: BTreeSet<u32>,
    pub days: BTreeSet<u32>,
    months: BTreeSet<u32>,
    weekdays: BTreeSet<u32>,
    pub dates: BTreeSet<NaiveDate>,
}

impl ExclusionOptions {
    pub fn month_names(&self) -> Vec<&'static str> {
        self.months
            .iter()
            .filter_map(|&m| Month::try_from(m as u8).ok())
            .map(|m| m.name())
            .collect()
    }

    pub fn weekday_names(&self) -> Vec<&'static str> {
        self.weekdays
            .iter()
            .filter_map(|&d| Weekday::try_from(d as u8).ok())
            .map(weekday_name)
            .collect()
    }
}
