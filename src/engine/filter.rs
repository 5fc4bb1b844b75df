//! Exclusion filter over the five calendar dimensions.

use std::collections::BTreeSet;

use chrono::{Month, NaiveDate, Weekday};
use serde::Serialize;
use tracing::debug;

use crate::data::{Dataset, Record, TimeParts};

/// One of the five independent exclusion dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Hour,
    DayOfMonth,
    Month,
    Weekday,
    Date,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Hour,
        Dimension::DayOfMonth,
        Dimension::Month,
        Dimension::Weekday,
        Dimension::Date,
    ];
}

/// Sets of calendar values whose records are dropped before analysis.
///
/// Every set defaults to empty, which excludes nothing. A record with a null
/// timestamp has null calendar fields, never matches any set, and is
/// therefore always retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSpec {
    hours: BTreeSet<u32>,
    days: BTreeSet<u32>,
    /// Month numbers 1–12.
    months: BTreeSet<u32>,
    /// Days from Monday, 0–6.
    weekdays: BTreeSet<u32>,
    dates: BTreeSet<NaiveDate>,
}

impl ExclusionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_hours(mut self, hours: impl IntoIterator<Item = u32>) -> Self {
        self.hours.extend(hours);
        self
    }

    pub fn exclude_days(mut self, days: impl IntoIterator<Item = u32>) -> Self {
        self.days.extend(days);
        self
    }

    pub fn exclude_months(mut self, months: impl IntoIterator<Item = Month>) -> Self {
        self.months
            .extend(months.into_iter().map(|m| m.number_from_month()));
        self
    }

    pub fn exclude_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays
            .extend(weekdays.into_iter().map(|d| d.num_days_from_monday()));
        self
    }

    pub fn exclude_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.dates.extend(dates);
        self
    }

    /// Whether no dimension excludes anything.
    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
            && self.days.is_empty()
            && self.months.is_empty()
            && self.weekdays.is_empty()
            && self.dates.is_empty()
    }

    /// Copy of this spec keeping only one dimension's set.
    pub fn only(&self, dim: Dimension) -> ExclusionSpec {
        let mut single = ExclusionSpec::default();
        match dim {
            Dimension::Hour => single.hours = self.hours.clone(),
            Dimension::DayOfMonth => single.days = self.days.clone(),
            Dimension::Month => single.months = self.months.clone(),
            Dimension::Weekday => single.weekdays = self.weekdays.clone(),
            Dimension::Date => single.dates = self.dates.clone(),
        }
        single
    }

    fn matches(&self, dim: Dimension, t: &TimeParts) -> bool {
        match dim {
            Dimension::Hour => self.hours.contains(&t.hour),
            Dimension::DayOfMonth => self.days.contains(&t.day),
            Dimension::Month => self.months.contains(&t.month.number_from_month()),
            Dimension::Weekday => self.weekdays.contains(&t.weekday.num_days_from_monday()),
            Dimension::Date => self.dates.contains(&t.date),
        }
    }

    /// Whether a record survives every dimension.
    pub fn retains(&self, record: &Record) -> bool {
        match &record.time {
            Some(t) => !Dimension::ALL.iter().any(|&d| self.matches(d, t)),
            None => true,
        }
    }

    /// Returns a new dataset holding the retained records.
    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        if self.is_empty() {
            return dataset.clone();
        }
        dataset.retain_where(|r| self.retains(r))
    }

    /// Applies the filter and reports how many rows it removed.
    pub fn apply_with_summary(&self, dataset: &Dataset) -> (Dataset, FilterSummary) {
        let filtered = self.apply(dataset);
        let summary = FilterSummary {
            total: dataset.len(),
            retained: filtered.len(),
            removed: dataset.len() - filtered.len(),
        };
        debug!(
            total = summary.total,
            retained = summary.retained,
            "applied exclusion filter"
        );
        (filtered, summary)
    }
}

/// Row accounting for one filter application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub total: usize,
    pub retained: usize,
    pub removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::parse_reader;

    // 2024-01-06 is a Saturday, 2024-02-05 a Monday.
    const ROWS: &str = "\
TIME_STAMP,C_1
01/06/2024 00:00:00,1
01/06/2024 13:00:00,2
02/05/2024 13:00:00,3
02/06/2024 07:00:00,4
03/15/2024 22:00:00,5
not-a-time,6
";

    fn dataset() -> Dataset {
        parse_reader(ROWS.as_bytes()).unwrap()
    }

    fn rows(ds: &Dataset) -> Vec<usize> {
        ds.records().iter().map(|r| r.row).collect()
    }

    fn full_spec() -> ExclusionSpec {
        ExclusionSpec::new()
            .exclude_hours([0])
            .exclude_days([6])
            .exclude_months([Month::March])
            .exclude_weekdays([Weekday::Sat])
            .exclude_dates(NaiveDate::from_ymd_opt(2024, 2, 5))
    }

    #[test]
    fn empty_spec_keeps_everything() {
        let ds = dataset();
        assert_eq!(ExclusionSpec::new().apply(&ds), ds);
    }

    #[test]
    fn each_dimension_excludes_its_field() {
        let ds = dataset();
        let by_hour = ExclusionSpec::new().exclude_hours([13]).apply(&ds);
        assert_eq!(rows(&by_hour), vec![0, 3, 4, 5]);

        let by_weekday = ExclusionSpec::new().exclude_weekdays([Weekday::Sat]).apply(&ds);
        assert_eq!(rows(&by_weekday), vec![2, 3, 4, 5]);

        let by_month = ExclusionSpec::new().exclude_months([Month::February]).apply(&ds);
        assert_eq!(rows(&by_month), vec![0, 1, 4, 5]);
    }

    #[test]
    fn null_timestamps_are_never_excluded() {
        let ds = dataset();
        let filtered = full_spec().apply(&ds);
        assert!(filtered.records().iter().any(|r| r.timestamp.is_none()));
        assert_eq!(rows(&filtered), vec![5]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let ds = dataset();
        let spec = ExclusionSpec::new().exclude_hours([7]).exclude_days([15]);
        let once = spec.apply(&ds);
        let twice = spec.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn dimension_order_does_not_matter() {
        let ds = dataset();
        let spec = full_spec();
        let together = spec.apply(&ds);

        let forward = Dimension::ALL
            .iter()
            .fold(ds.clone(), |acc, &d| spec.only(d).apply(&acc));
        let backward = Dimension::ALL
            .iter()
            .rev()
            .fold(ds.clone(), |acc, &d| spec.only(d).apply(&acc));

        assert_eq!(together, forward);
        assert_eq!(together, backward);
    }

    #[test]
    fn summary_counts_removed_rows() {
        let ds = dataset();
        let (_, summary) = ExclusionSpec::new().exclude_hours([13]).apply_with_summary(&ds);
        assert_eq!(
            summary,
            FilterSummary {
                total: 6,
                retained: 4,
                removed: 2
            }
        );
    }
}
