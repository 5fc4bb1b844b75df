//! Shared engine types: annotated records and mean/count statistics.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::classify::InstallationType;
use super::temperature::TemperatureView;
use crate::data::TimeParts;

/// A filtered record annotated for one system: load, temperatures and
/// installation class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    /// Row index in the raw table.
    pub row: usize,
    pub timestamp: Option<NaiveDateTime>,
    #[serde(skip)]
    pub time: Option<TimeParts>,
    pub kw_sum: f64,
    pub kw_sum_average: Option<f64>,
    pub temp_out: Option<f64>,
    pub temp_gate: Option<f64>,
    #[serde(flatten)]
    pub temperature: TemperatureView,
    pub installation: InstallationType,
}

/// Mean and count of the non-null values in a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStat {
    pub mean_kw: f64,
    pub count: usize,
}

impl fmt::Display for GroupStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} kW (n={})", self.mean_kw, self.count)
    }
}

/// Running sum used to build a [`GroupStat`] without storing values.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    /// Adds a value; nulls are skipped.
    pub(crate) fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    /// `None` when no non-null value was pushed.
    pub(crate) fn finish(self) -> Option<GroupStat> {
        (self.count > 0).then(|| GroupStat {
            mean_kw: self.sum / self.count as f64,
            count: self.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_skips_nulls() {
        let mut acc = MeanAccumulator::default();
        acc.push(Some(2.0));
        acc.push(None);
        acc.push(Some(4.0));
        assert_eq!(
            acc.finish(),
            Some(GroupStat {
                mean_kw: 3.0,
                count: 2
            })
        );
    }

    #[test]
    fn empty_accumulator_has_no_stat() {
        let mut acc = MeanAccumulator::default();
        acc.push(None);
        assert_eq!(acc.finish(), None);
    }
}
