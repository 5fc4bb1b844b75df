//! System definitions decoded from the JSON sidecar.
//!
//! The sidecar is a flat object: `"System <n>"` keys map to an ordered list
//! of circuit column names and `"Installation Date System <n>"` keys map to
//! an ISO date string.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ConfigurationError, DataError};

const SYSTEM_PREFIX: &str = "System ";
const INSTALL_PREFIX: &str = "Installation Date System ";

/// Typed identifier of a system, displayed as `System <n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemId(pub u32);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System {}", self.0)
    }
}

impl Serialize for SystemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for SystemId {
    type Err = ConfigurationError;

    /// Accepts either `"System 2"` or a bare number `"2"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix(SYSTEM_PREFIX).unwrap_or(s);
        digits
            .trim()
            .parse::<u32>()
            .map(SystemId)
            .map_err(|_| ConfigurationError::InvalidSidecar {
                message: format!("'{s}' is not a system identifier"),
            })
    }
}

/// One logical unit under analysis: a group of circuits and its install date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct System {
    pub id: SystemId,
    /// Circuit column names in sidecar order; may be empty.
    pub circuits: Vec<String>,
    /// Installation date, if the sidecar carries one.
    pub installation_date: Option<NaiveDate>,
}

/// The read-only set of systems defined for a project, ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemSet {
    systems: BTreeMap<SystemId, System>,
}

impl SystemSet {
    pub fn new(systems: impl IntoIterator<Item = System>) -> Self {
        Self {
            systems: systems.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// Looks up a system.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownSystem` when `id` is not defined.
    pub fn get(&self, id: SystemId) -> Result<&System, ConfigurationError> {
        self.systems
            .get(&id)
            .ok_or(ConfigurationError::UnknownSystem { system: id })
    }

    pub fn iter(&self) -> impl Iterator<Item = &System> {
        self.systems.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = SystemId> + '_ {
        self.systems.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Reads system definitions from a sidecar file.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Io` if the file cannot be read, otherwise the
    /// errors of [`SystemSet::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self, DataError> {
        let content = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Decodes system definitions from sidecar JSON text.
    ///
    /// Keys that are neither circuit lists nor installation dates are
    /// ignored. An installation date for a system with no circuit list
    /// defines nothing and is dropped.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Json` for malformed JSON, and a wrapped
    /// `ConfigurationError` when the top level is not an object, a circuit
    /// list is not an array of strings, or a date is not `YYYY-MM-DD`.
    pub fn from_json_str(s: &str) -> Result<Self, DataError> {
        let value: Value = serde_json::from_str(s)?;
        Ok(Self::from_json_value(&value)?)
    }

    fn from_json_value(value: &Value) -> Result<Self, ConfigurationError> {
        let map = value
            .as_object()
            .ok_or_else(|| ConfigurationError::InvalidSidecar {
                message: "top level must be an object".to_string(),
            })?;

        let mut circuits: BTreeMap<SystemId, Vec<String>> = BTreeMap::new();
        let mut dates: BTreeMap<SystemId, NaiveDate> = BTreeMap::new();

        for (key, v) in map {
            if let Some(rest) = key.strip_prefix(INSTALL_PREFIX) {
                let id: SystemId = rest.parse()?;
                let raw = v.as_str().unwrap_or_default();
                let date = parse_install_date(raw).ok_or_else(|| {
                    ConfigurationError::InvalidInstallationDate {
                        key: key.clone(),
                        value: v.to_string(),
                    }
                })?;
                dates.insert(id, date);
            } else if key.starts_with(SYSTEM_PREFIX) {
                let id: SystemId = key.parse()?;
                let list = v
                    .as_array()
                    .ok_or_else(|| ConfigurationError::InvalidCircuitList { key: key.clone() })?;
                let names = list
                    .iter()
                    .map(|c| c.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| ConfigurationError::InvalidCircuitList { key: key.clone() })?;
                circuits.insert(id, names);
            } else {
                debug!(key = %key, "ignoring unrecognised sidecar key");
            }
        }

        for id in dates.keys().filter(|id| !circuits.contains_key(id)) {
            warn!(system = %id, "installation date given for a system with no circuit list");
        }

        let systems = circuits.into_iter().map(|(id, circuits)| System {
            id,
            circuits,
            installation_date: dates.get(&id).copied(),
        });
        Ok(Self::new(systems))
    }
}

/// Parses an ISO date, tolerating a trailing time component.
fn parse_install_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDECAR: &str = r#"{
        "Installation Date System 1": "2024-03-01",
        "System 1": ["C_1", "C_2"],
        "System 2": ["C_3"],
        "Installation Date System 2": "2024-04-15",
        "System 10": []
    }"#;

    #[test]
    fn decodes_systems_in_id_order() {
        let set = SystemSet::from_json_str(SIDECAR).unwrap();
        let ids: Vec<u32> = set.ids().map(|id| id.0).collect();
        assert_eq!(ids, vec![1, 2, 10]);

        let s1 = set.get(SystemId(1)).unwrap();
        assert_eq!(s1.circuits, vec!["C_1".to_string(), "C_2".to_string()]);
        assert_eq!(s1.installation_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        let s10 = set.get(SystemId(10)).unwrap();
        assert!(s10.circuits.is_empty());
        assert_eq!(s10.installation_date, None);
    }

    #[test]
    fn unknown_system_is_configuration_error() {
        let set = SystemSet::from_json_str(SIDECAR).unwrap();
        assert_eq!(
            set.get(SystemId(7)).err(),
            Some(ConfigurationError::UnknownSystem { system: SystemId(7) })
        );
    }

    #[test]
    fn bad_date_names_the_key() {
        let err = SystemSet::from_json_str(r#"{"System 1": [], "Installation Date System 1": "03/01/2024"}"#)
            .err();
        match err {
            Some(DataError::Configuration(ConfigurationError::InvalidInstallationDate { key, .. })) => {
                assert_eq!(key, "Installation Date System 1");
            }
            other => panic!("expected InvalidInstallationDate, got {other:?}"),
        }
    }

    #[test]
    fn circuit_list_must_be_strings() {
        let err = SystemSet::from_json_str(r#"{"System 1": [1, 2]}"#).err();
        assert!(matches!(
            err,
            Some(DataError::Configuration(ConfigurationError::InvalidCircuitList { .. }))
        ));
    }

    #[test]
    fn system_id_parses_both_forms() {
        assert_eq!("System 3".parse::<SystemId>().ok(), Some(SystemId(3)));
        assert_eq!("4".parse::<SystemId>().ok(), Some(SystemId(4)));
        assert!("Pump".parse::<SystemId>().is_err());
        assert_eq!(SystemId(5).to_string(), "System 5");
    }

    #[test]
    fn datetime_suffix_is_tolerated() {
        assert_eq!(
            parse_install_date("2024-05-02 00:00:00"),
            NaiveDate::from_ymd_opt(2024, 5, 2)
        );
    }
}
