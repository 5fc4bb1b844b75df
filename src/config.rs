//! TOML-based analysis configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{Month, NaiveDate, Weekday};
use serde::Deserialize;

use crate::data::SystemId;
use crate::engine::{AnalysisRequest, ExclusionSpec, RoundingStep, TempQuantity, TempRange};
use crate::error::ConfigurationError;

/// Top-level analysis configuration parsed from TOML.
///
/// All fields have defaults matching an unfiltered ∆T analysis with a 0.5
/// rounding step. Load from TOML with [`AnalysisConfig::from_toml_file`] or
/// start from [`AnalysisConfig::baseline`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Rounding and bucketing parameters.
    #[serde(default)]
    pub temperature: TemperatureConfig,
    /// Calendar values to drop before analysis.
    #[serde(default)]
    pub exclusions: ExclusionConfig,
    /// Installation date handling.
    #[serde(default)]
    pub installation: InstallationConfig,
}

/// Rounding and bucketing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemperatureConfig {
    /// Rounding step `m` (must be > 0).
    pub m_round: f64,
    /// Quantity used for buckets: `"delta_t"`, `"temp_out"` or `"temp_gate"`.
    pub quantity: TempQuantity,
    /// Optional inclusive `[lo, hi]` on the rounded quantity.
    pub range: Option<[f64; 2]>,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            m_round: 0.5,
            quantity: TempQuantity::DeltaT,
            range: None,
        }
    }
}

/// Calendar exclusions. Names are full English names or three-letter
/// abbreviations; dates are quoted `"YYYY-MM-DD"` strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExclusionConfig {
    /// Hours of day (0–23).
    pub hours: Vec<u32>,
    /// Days of month (1–31).
    pub days: Vec<u32>,
    /// Month names.
    pub months: Vec<String>,
    /// Weekday names.
    pub weekdays: Vec<String>,
    /// Specific calendar dates.
    pub dates: Vec<NaiveDate>,
}

/// Installation date handling.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallationConfig {
    /// Replaces every system's sidecar installation date.
    pub override_date: Option<NaiveDate>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"temperature.m_round"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl AnalysisConfig {
    /// Returns the default configuration: no exclusions, ∆T, step 0.5.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the weekdays-only preset: weekends excluded.
    pub fn weekdays_only() -> Self {
        Self {
            exclusions: ExclusionConfig {
                weekdays: vec!["Saturday".to_string(), "Sunday".to_string()],
                ..ExclusionConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the occupied-hours preset: weekdays, 07:00–18:59 only.
    pub fn occupied_hours() -> Self {
        let mut cfg = Self::weekdays_only();
        cfg.exclusions.hours = (0..7).chain(19..24).collect();
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["default", "weekdays_only", "occupied_hours"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "default" => Ok(Self::baseline()),
            "weekdays_only" => Ok(Self::weekdays_only()),
            "occupied_hours" => Ok(Self::occupied_hours()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let t = &self.temperature;
        if let Err(e) = RoundingStep::new(t.m_round) {
            errors.push(ConfigError {
                field: "temperature.m_round".into(),
                message: e.to_string(),
            });
        }
        if let Some([lo, hi]) = t.range {
            if let Err(e) = TempRange::new(lo, hi) {
                errors.push(ConfigError {
                    field: "temperature.range".into(),
                    message: e.to_string(),
                });
            }
        }

        let ex = &self.exclusions;
        if let Some(h) = ex.hours.iter().find(|&&h| h > 23) {
            errors.push(ConfigError {
                field: "exclusions.hours".into(),
                message: format!("must be in 0..=23, got {h}"),
            });
        }
        if let Some(d) = ex.days.iter().find(|&&d| !(1..=31).contains(&d)) {
            errors.push(ConfigError {
                field: "exclusions.days".into(),
                message: format!("must be in 1..=31, got {d}"),
            });
        }
        for m in &ex.months {
            if m.parse::<Month>().is_err() {
                errors.push(ConfigError {
                    field: "exclusions.months".into(),
                    message: format!("unknown month \"{m}\""),
                });
            }
        }
        for w in &ex.weekdays {
            if w.parse::<Weekday>().is_err() {
                errors.push(ConfigError {
                    field: "exclusions.weekdays".into(),
                    message: format!("unknown weekday \"{w}\""),
                });
            }
        }

        errors
    }

    /// Builds the exclusion filter. Unparsable names are skipped; call
    /// [`AnalysisConfig::validate`] first to report them.
    pub fn exclusion_spec(&self) -> ExclusionSpec {
        let ex = &self.exclusions;
        ExclusionSpec::new()
            .exclude_hours(ex.hours.iter().copied())
            .exclude_days(ex.days.iter().copied())
            .exclude_months(ex.months.iter().filter_map(|m| m.parse::<Month>().ok()))
            .exclude_weekdays(ex.weekdays.iter().filter_map(|w| w.parse::<Weekday>().ok()))
            .exclude_dates(ex.dates.iter().copied())
    }

    /// Builds an analysis request for one system.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` for a non-positive rounding step or an
    /// inverted range.
    pub fn request(&self, system: SystemId) -> Result<AnalysisRequest, ConfigurationError> {
        let t = &self.temperature;
        let range = t.range.map(|[lo, hi]| TempRange::new(lo, hi)).transpose()?;
        Ok(AnalysisRequest {
            system,
            exclusions: self.exclusion_spec(),
            step: RoundingStep::new(t.m_round)?,
            quantity: t.quantity,
            range,
            installation_date: self.installation.override_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = AnalysisConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
        assert!(cfg.exclusion_spec().is_empty());
    }

    #[test]
    fn from_preset_unknown() {
        let err = AnalysisConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in AnalysisConfig::PRESETS {
            let cfg = AnalysisConfig::from_preset(name).unwrap();
            let errors = cfg.validate();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn occupied_hours_excludes_nights() {
        let cfg = AnalysisConfig::occupied_hours();
        assert_eq!(cfg.exclusions.hours.len(), 12);
        assert!(!cfg.exclusions.hours.contains(&12));
        assert_eq!(cfg.exclusions.weekdays.len(), 2);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[temperature]
m_round = 1.0
quantity = "temp_out"
range = [-5.0, 15.0]

[exclusions]
hours = [0, 1, 2]
days = [25]
months = ["December"]
weekdays = ["Saturday", "sun"]
dates = ["2024-07-04"]

[installation]
override_date = "2024-06-01"
"#;
        let cfg = AnalysisConfig::from_toml_str(toml).expect("valid TOML should parse");
        assert_eq!(cfg.temperature.quantity, TempQuantity::TempOut);
        assert_eq!(cfg.exclusions.dates.len(), 1);
        assert_eq!(
            cfg.installation.override_date,
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[temperature]
m_round = 0.5
bogus_field = true
"#;
        assert!(AnalysisConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[exclusions]
hours = [3]
"#;
        let cfg = AnalysisConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.temperature.m_round, 0.5);
        assert_eq!(cfg.temperature.quantity, TempQuantity::DeltaT);
        assert_eq!(cfg.exclusions.hours, vec![3]);
    }

    #[test]
    fn validation_catches_bad_step_and_range() {
        let mut cfg = AnalysisConfig::baseline();
        cfg.temperature.m_round = 0.0;
        cfg.temperature.range = Some([4.0, 1.0]);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "temperature.m_round"));
        assert!(errors.iter().any(|e| e.field == "temperature.range"));
    }

    #[test]
    fn validation_catches_bad_calendar_values() {
        let mut cfg = AnalysisConfig::baseline();
        cfg.exclusions.hours = vec![24];
        cfg.exclusions.days = vec![0];
        cfg.exclusions.months = vec!["Smarch".into()];
        cfg.exclusions.weekdays = vec!["Caturday".into()];
        let fields: Vec<String> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "exclusions.hours",
                "exclusions.days",
                "exclusions.months",
                "exclusions.weekdays"
            ]
        );
    }

    #[test]
    fn request_rejects_non_positive_step() {
        let mut cfg = AnalysisConfig::baseline();
        cfg.temperature.m_round = -1.0;
        assert_eq!(
            cfg.request(SystemId(1)).err(),
            Some(ConfigurationError::InvalidRoundingStep { value: -1.0 })
        );
    }

    #[test]
    fn request_carries_config() {
        let cfg = AnalysisConfig::weekdays_only();
        let request = cfg.request(SystemId(3)).unwrap();
        assert_eq!(request.system, SystemId(3));
        assert!(!request.exclusions.is_empty());
        assert_eq!(request.step.value(), 0.5);
    }
}
