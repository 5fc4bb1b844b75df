//! Per-system power aggregation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::data::{Dataset, System, SystemId, SystemSet};

/// Aggregated power of one system at one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemLoad {
    /// Sum of the system's circuit readings; null cells and absent circuit
    /// columns contribute zero.
    pub kw_sum: f64,
    /// Mean of `kw_sum` over every record sharing this record's
    /// `(hour, date)`. `None` when the record has no timestamp.
    pub kw_sum_average: Option<f64>,
}

/// Derived load columns of one system, keyed by raw row index.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile {
    pub system: SystemId,
    loads: Vec<SystemLoad>,
}

impl LoadProfile {
    /// Load at a raw row index, as stored in [`crate::data::Record::row`].
    pub fn at(&self, row: usize) -> Option<&SystemLoad> {
        self.loads.get(row)
    }

    pub fn loads(&self) -> &[SystemLoad] {
        &self.loads
    }
}

/// Computes `KW_SUM` and the `(hour, date)` smoothed average for one system.
///
/// Must run on the unfiltered dataset so that row indices line up with
/// [`LoadProfile::at`].
pub fn aggregate_system(dataset: &Dataset, system: &System) -> LoadProfile {
    let schema = dataset.schema();
    let indices: Vec<usize> = system
        .circuits
        .iter()
        .filter_map(|name| {
            let idx = schema.circuit_index(name);
            if idx.is_none() {
                warn!(system = %system.id, circuit = %name, "circuit column not in dataset; counted as zero");
            }
            idx
        })
        .collect();

    let kw_sums: Vec<f64> = dataset
        .records()
        .iter()
        .map(|r| {
            indices
                .iter()
                .filter_map(|&i| r.circuits.get(i).copied().flatten())
                .fold(0.0, |acc, kw| acc + kw)
        })
        .collect();

    // (hour, date) -> (sum, count); accumulated in row order
    let mut groups: BTreeMap<(u32, NaiveDate), (f64, usize)> = BTreeMap::new();
    for (r, &kw) in dataset.records().iter().zip(&kw_sums) {
        if let Some(t) = r.time {
            let entry = groups.entry((t.hour, t.date)).or_insert((0.0, 0));
            entry.0 += kw;
            entry.1 += 1;
        }
    }

    // No circuits: every record averages zero, timestamp or not
    let no_circuits = indices.is_empty();
    let loads = dataset
        .records()
        .iter()
        .zip(kw_sums)
        .map(|(r, kw_sum)| SystemLoad {
            kw_sum,
            kw_sum_average: if no_circuits {
                Some(0.0)
            } else {
                r.time.and_then(|t| {
                    groups
                        .get(&(t.hour, t.date))
                        .map(|&(sum, n)| sum / n as f64)
                })
            },
        })
        .collect();

    debug!(system = %system.id, groups = groups.len(), "aggregated system load");
    LoadProfile {
        system: system.id,
        loads,
    }
}

/// Aggregates every system independently.
pub fn aggregate_all(dataset: &Dataset, systems: &SystemSet) -> BTreeMap<SystemId, LoadProfile> {
    systems
        .iter()
        .map(|s| (s.id, aggregate_system(dataset, s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::parse_reader;

    fn system(id: u32, circuits: &[&str]) -> System {
        System {
            id: SystemId(id),
            circuits: circuits.iter().map(|c| c.to_string()).collect(),
            installation_date: None,
        }
    }

    fn dataset(csv: &str) -> Dataset {
        parse_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn sums_configured_circuits_per_system() {
        let ds = dataset(
            "TIME_STAMP,C_1,C_2,C_3\n\
             01/01/2024 00:00:00,10,5,7\n\
             01/01/2024 01:00:00,10,5,7\n",
        );
        let set = SystemSet::new([system(1, &["C_1", "C_2"]), system(2, &["C_3"])]);
        let profiles = aggregate_all(&ds, &set);

        let s1: Vec<f64> = profiles[&SystemId(1)].loads().iter().map(|l| l.kw_sum).collect();
        let s2: Vec<f64> = profiles[&SystemId(2)].loads().iter().map(|l| l.kw_sum).collect();
        assert_eq!(s1, vec![15.0, 15.0]);
        assert_eq!(s2, vec![7.0, 7.0]);
    }

    #[test]
    fn empty_circuit_set_is_zero() {
        let ds = dataset(
            "TIME_STAMP,C_1\n\
             01/01/2024 00:00:00,3\n\
             01/01/2024 00:30:00,4\n\
             01/02/2024 05:00:00,9\n\
             bad,1\n",
        );
        let profile = aggregate_system(&ds, &system(1, &[]));
        assert_eq!(profile.loads().len(), 4);
        for load in profile.loads() {
            assert_eq!(load.kw_sum, 0.0);
            assert_eq!(load.kw_sum_average, Some(0.0));
        }
    }

    #[test]
    fn average_is_shared_within_hour_and_date() {
        let ds = dataset(
            "TIME_STAMP,C_1\n\
             01/01/2024 08:00:00,2\n\
             01/01/2024 08:15:00,4\n\
             01/01/2024 08:45:00,9\n\
             01/02/2024 08:00:00,100\n",
        );
        let profile = aggregate_system(&ds, &system(1, &["C_1"]));
        let avgs: Vec<Option<f64>> = profile.loads().iter().map(|l| l.kw_sum_average).collect();
        assert_eq!(avgs, vec![Some(5.0), Some(5.0), Some(5.0), Some(100.0)]);
    }

    #[test]
    fn null_cells_and_missing_columns_count_as_zero() {
        let ds = dataset("TIME_STAMP,C_1,C_2\n01/01/2024 00:00:00,,6\n");
        let profile = aggregate_system(&ds, &system(1, &["C_1", "C_2", "C_99"]));
        assert_eq!(profile.at(0).map(|l| l.kw_sum), Some(6.0));
    }

    #[test]
    fn unparsed_timestamp_has_no_average() {
        let ds = dataset("TIME_STAMP,C_1\nbad,6\n01/01/2024 00:00:00,2\n");
        let profile = aggregate_system(&ds, &system(1, &["C_1"]));
        assert_eq!(profile.at(0).map(|l| l.kw_sum), Some(6.0));
        assert_eq!(profile.at(0).and_then(|l| l.kw_sum_average), None);
        assert_eq!(profile.at(1).and_then(|l| l.kw_sum_average), Some(2.0));
    }
}
