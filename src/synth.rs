//! Deterministic synthetic site generator for demos and tests.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Map, Value};

use crate::data::parser::{CIRCUIT_PREFIX, TEMP_GATE, TEMP_OUT, TIME_STAMP, TIMESTAMP_FORMAT};
use crate::data::{Dataset, Record, Schema, System, SystemId, SystemSet};
use crate::error::DataError;
use crate::io::project::ProjectFiles;

/// Parameters of a synthetic site sampled hourly.
///
/// Outdoor temperature follows a daily sinusoid peaking mid-afternoon, the
/// gate temperature lags it toward a set point, and every circuit draws a
/// base load plus a term proportional to the temperature differential.
/// From each system's installation date on, its circuits draw
/// `1 - savings_fraction` of that load.
#[derive(Debug, Clone)]
pub struct SyntheticSite {
    pub systems: u32,
    pub circuits_per_system: usize,
    /// First sampled day.
    pub start: NaiveDate,
    pub days: u32,
    /// Offset of the first system's installation date from `start`; each
    /// further system installs one day later.
    pub install_after_days: u32,
    /// Fractional load reduction after installation (0.0 to 1.0).
    pub savings_fraction: f64,
    /// Standard deviation of the Gaussian noise on loads and temperatures.
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for SyntheticSite {
    fn default() -> Self {
        Self {
            systems: 2,
            circuits_per_system: 3,
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default(),
            days: 28,
            install_after_days: 14,
            savings_fraction: 0.2,
            noise_std: 0.1,
            seed: 42,
        }
    }
}

const SET_POINT_C: f64 = 21.0;
const MEAN_OUT_C: f64 = 27.0;
const SWING_OUT_C: f64 = 6.0;
const KW_PER_DEGREE: f64 = 0.15;

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl SyntheticSite {
    /// Name of the `j`th circuit (0-based) of a system.
    fn circuit_name(&self, system: u32, j: usize) -> String {
        let global = (system as usize - 1) * self.circuits_per_system + j + 1;
        format!("{CIRCUIT_PREFIX}{global}")
    }

    fn installation_date(&self, system: u32) -> NaiveDate {
        self.start + Duration::days(i64::from(self.install_after_days + system - 1))
    }

    /// System definitions matching the generated circuits.
    pub fn system_set(&self) -> SystemSet {
        SystemSet::new((1..=self.systems).map(|n| System {
            id: SystemId(n),
            circuits: (0..self.circuits_per_system)
                .map(|j| self.circuit_name(n, j))
                .collect(),
            installation_date: Some(self.installation_date(n)),
        }))
    }

    /// Generates the dataset and its system definitions.
    ///
    /// Identical parameters always produce identical output.
    pub fn generate(&self) -> (Dataset, SystemSet) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut gauss = move || {
            // Box-Muller
            let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
            let u2: f64 = rng.random::<f64>();
            (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
        };

        let circuits: Vec<String> = (1..=self.systems)
            .flat_map(|n| (0..self.circuits_per_system).map(move |j| (n, j)))
            .map(|(n, j)| self.circuit_name(n, j))
            .collect();
        let schema = Schema {
            circuits,
            has_temp_out: true,
            has_temp_gate: true,
            has_humidity: false,
        };

        let origin = NaiveDateTime::new(self.start, NaiveTime::MIN);
        let hours = self.days as usize * 24;
        let mut records = Vec::with_capacity(hours);

        for row in 0..hours {
            let ts = origin + Duration::hours(row as i64);
            let hour = (row % 24) as f64;
            let angle = 2.0 * std::f64::consts::PI * (hour - 9.0) / 24.0;
            let temp_out = MEAN_OUT_C + SWING_OUT_C * angle.sin() + self.noise_std * gauss();
            let temp_gate = SET_POINT_C + 0.3 * (temp_out - SET_POINT_C);
            let delta = temp_out - temp_gate;

            let mut record = Record::new(row, ts.format(TIMESTAMP_FORMAT).to_string(), Some(ts));
            record.temp_out = Some(round2(temp_out));
            record.temp_gate = Some(round2(temp_gate));
            for n in 1..=self.systems {
                let installed = NaiveDateTime::new(self.installation_date(n), NaiveTime::MIN);
                let factor = if ts > installed {
                    1.0 - self.savings_fraction
                } else {
                    1.0
                };
                for j in 0..self.circuits_per_system {
                    let base = 1.0 + 0.25 * j as f64;
                    let kw = (base + KW_PER_DEGREE * delta.abs() + self.noise_std * gauss())
                        .max(0.0);
                    record.circuits.push(Some(round2(kw * factor)));
                }
            }
            records.push(record);
        }

        (Dataset::new(schema, records), self.system_set())
    }

    /// Writes `dataset` in the raw table layout.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if writing fails.
    pub fn write_csv(dataset: &Dataset, writer: impl Write) -> io::Result<()> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);

        let schema = dataset.schema();
        let mut header = vec![TIME_STAMP.to_string()];
        header.extend(schema.circuits.iter().cloned());
        header.push(TEMP_OUT.to_string());
        header.push(TEMP_GATE.to_string());
        wtr.write_record(&header)?;

        let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        for r in dataset.records() {
            let mut row = vec![r.raw_timestamp.clone()];
            row.extend(r.circuits.iter().map(|&c| cell(c)));
            row.push(cell(r.temp_out));
            row.push(cell(r.temp_gate));
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Sidecar JSON for the generated systems.
    pub fn sidecar_json(&self) -> Value {
        let mut map = Map::new();
        for system in self.system_set().iter() {
            map.insert(
                system.id.to_string(),
                Value::from(system.circuits.clone()),
            );
            if let Some(date) = system.installation_date {
                map.insert(
                    format!("Installation Date {}", system.id),
                    Value::from(date.format("%Y-%m-%d").to_string()),
                );
            }
        }
        Value::Object(map)
    }

    /// Generates the site and writes it as a project directory
    /// (`readings.csv` + `systems.json`).
    ///
    /// # Errors
    ///
    /// Returns `DataError::Io` if the directory or files cannot be written.
    pub fn write_project(&self, dir: &Path) -> Result<ProjectFiles, DataError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| DataError::Io { path, source }
        };

        fs::create_dir_all(dir).map_err(io_err(dir))?;
        let files = ProjectFiles {
            data: dir.join("readings.csv"),
            systems: dir.join("systems.json"),
        };

        let (dataset, _) = self.generate();
        let file = fs::File::create(&files.data).map_err(io_err(&files.data))?;
        Self::write_csv(&dataset, io::BufWriter::new(file)).map_err(io_err(&files.data))?;

        let json = serde_json::to_string_pretty(&self.sidecar_json())?;
        fs::write(&files.systems, json).map_err(io_err(&files.systems))?;
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::parse_reader;

    #[test]
    fn same_seed_same_site() {
        let site = SyntheticSite::default();
        assert_eq!(site.generate(), site.generate());
    }

    #[test]
    fn different_seed_different_loads() {
        let a = SyntheticSite::default().generate().0;
        let b = SyntheticSite {
            seed: 7,
            ..SyntheticSite::default()
        }
        .generate()
        .0;
        assert_ne!(a, b);
    }

    #[test]
    fn shape_matches_parameters() {
        let site = SyntheticSite {
            systems: 3,
            circuits_per_system: 2,
            days: 2,
            ..SyntheticSite::default()
        };
        let (dataset, systems) = site.generate();
        assert_eq!(dataset.len(), 48);
        assert_eq!(dataset.schema().circuits.len(), 6);
        assert_eq!(systems.len(), 3);
        let third = systems.get(SystemId(3)).unwrap();
        assert_eq!(third.circuits, vec!["C_5".to_string(), "C_6".to_string()]);
        assert_eq!(third.installation_date, NaiveDate::from_ymd_opt(2024, 6, 17));
    }

    #[test]
    fn csv_round_trips_through_parser() {
        let site = SyntheticSite {
            days: 3,
            ..SyntheticSite::default()
        };
        let (dataset, _) = site.generate();
        let mut buf = Vec::new();
        SyntheticSite::write_csv(&dataset, &mut buf).unwrap();
        let parsed = parse_reader(buf.as_slice()).unwrap();
        assert_eq!(parsed, dataset);
    }

    #[test]
    fn sidecar_decodes_to_same_systems() {
        let site = SyntheticSite::default();
        let decoded = SystemSet::from_json_str(&site.sidecar_json().to_string()).unwrap();
        assert_eq!(decoded, site.system_set());
    }
}
