//! Calendar breakdowns of the smoothed load for charting.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use super::types::{AnalysisRecord, GroupStat, MeanAccumulator};
use crate::data::TimeParts;
use crate::data::record::weekday_name;

/// One bar of a breakdown chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow<K> {
    pub key: K,
    pub mean_kw: f64,
    pub count: usize,
}

/// Mean/count of `KW_SUM_Average` grouped by each calendar field.
///
/// Records without a timestamp belong to no group. Weekdays are ordered
/// Monday first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub by_hour: Vec<GroupRow<u32>>,
    pub by_weekday: Vec<GroupRow<&'static str>>,
    pub by_date: Vec<GroupRow<NaiveDate>>,
    pub by_day: Vec<GroupRow<u32>>,
}

fn group_by<K, F>(records: &[AnalysisRecord], key: F) -> Vec<GroupRow<K>>
where
    K: Ord,
    F: Fn(&TimeParts) -> K,
{
    let mut groups: BTreeMap<K, MeanAccumulator> = BTreeMap::new();
    for r in records {
        if let Some(t) = r.time.as_ref() {
            groups.entry(key(t)).or_default().push(r.kw_sum_average);
        }
    }
    groups
        .into_iter()
        .filter_map(|(key, acc)| {
            acc.finish().map(|GroupStat { mean_kw, count }| GroupRow {
                key,
                mean_kw,
                count,
            })
        })
        .collect()
}

impl Breakdown {
    pub fn from_records(records: &[AnalysisRecord]) -> Self {
        let by_weekday = group_by(records, |t| t.weekday.num_days_from_monday())
            .into_iter()
            .map(|row| GroupRow {
                key: Weekday::try_from(row.key as u8).map_or("", weekday_name),
                mean_kw: row.mean_kw,
                count: row.count,
            })
            .collect();
        Self {
            by_hour: group_by(records, |t| t.hour),
            by_weekday,
            by_date: group_by(records, |t| t.date),
            by_day: group_by(records, |t| t.day),
        }
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mean KW_SUM_Average by weekday:")?;
        for row in &self.by_weekday {
            writeln!(f, "  {:<10} {:>10.3} (n={})", row.key, row.mean_kw, row.count)?;
        }
        write!(f, "Mean KW_SUM_Average by hour:")?;
        for row in &self.by_hour {
            write!(f, "\n  {:02}:00      {:>10.3} (n={})", row.key, row.mean_kw, row.count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::parse_timestamp;
    use crate::engine::classify::InstallationType;
    use crate::engine::temperature::TemperatureView;

    fn record(ts: &str, kw: f64) -> AnalysisRecord {
        let timestamp = parse_timestamp(ts);
        AnalysisRecord {
            row: 0,
            timestamp,
            time: timestamp.as_ref().map(TimeParts::from_timestamp),
            kw_sum: kw,
            kw_sum_average: Some(kw),
            temp_out: None,
            temp_gate: None,
            temperature: TemperatureView::default(),
            installation: InstallationType::PreInstallation,
        }
    }

    #[test]
    fn groups_by_each_calendar_field() {
        // 2024-01-07 is a Sunday, 2024-01-08 a Monday
        let records = vec![
            record("01/07/2024 10:00:00", 2.0),
            record("01/08/2024 10:00:00", 4.0),
            record("01/08/2024 11:00:00", 6.0),
            record("garbage", 100.0),
        ];
        let b = Breakdown::from_records(&records);

        assert_eq!(b.by_hour.len(), 2);
        assert_eq!(b.by_hour[0].key, 10);
        assert_eq!(b.by_hour[0].mean_kw, 3.0);
        assert_eq!(b.by_hour[0].count, 2);

        let weekdays: Vec<&str> = b.by_weekday.iter().map(|r| r.key).collect();
        assert_eq!(weekdays, vec!["Monday", "Sunday"]);
        assert_eq!(b.by_weekday[0].mean_kw, 5.0);

        assert_eq!(b.by_date.len(), 2);
        assert_eq!(b.by_day.iter().map(|r| r.key).collect::<Vec<_>>(), vec![7, 8]);
    }

    #[test]
    fn display_lists_weekdays_then_hours() {
        let records = vec![record("01/08/2024 10:00:00", 4.0)];
        let text = Breakdown::from_records(&records).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("Monday"));
        assert!(lines[3].contains("10:00"));
        assert!(lines[3].ends_with("(n=1)"));
    }
}
