//! Temperature differential and m-rounding into buckets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{Dataset, Record};
use crate::error::ConfigurationError;

/// Default rounding step.
pub const DEFAULT_STEP: f64 = 0.5;

/// A validated, strictly positive rounding step `m`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundingStep(f64);

impl RoundingStep {
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidRoundingStep` for `m <= 0`, NaN or
    /// infinity.
    pub fn new(m: f64) -> Result<Self, ConfigurationError> {
        if m.is_finite() && m > 0.0 {
            Ok(Self(m))
        } else {
            Err(ConfigurationError::InvalidRoundingStep { value: m })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Nearest multiple of `m`, ties to even.
    ///
    /// `None` for a null, NaN or infinite input. Once `|v / m|` reaches
    /// 2^52 every representable `v` is already a multiple, so `v` is its
    /// own bucket.
    pub fn bucket(self, value: Option<f64>) -> Option<Bucket> {
        let v = value.filter(|v| v.is_finite())?;
        let q = v / self.0;
        let rounded = if q.abs() >= EXACT_QUOTIENT {
            v
        } else {
            q.round_ties_even() * self.0
        };
        rounded.is_finite().then_some(Bucket(rounded + 0.0))
    }
}

/// Quotient magnitude from which every `f64` is an integer.
const EXACT_QUOTIENT: f64 = 4_503_599_627_370_496.0;

/// A rounded value usable as an ordered map key.
///
/// Never NaN and never `-0.0`, so `total_cmp` agrees with numeric order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket(f64);

impl Bucket {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for Bucket {}

impl PartialOrd for Bucket {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bucket {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Default for RoundingStep {
    fn default() -> Self {
        Self(DEFAULT_STEP)
    }
}

/// Rounds to the nearest multiple of `step`, ties to even; null stays null.
pub fn round_to(value: Option<f64>, step: RoundingStep) -> Option<f64> {
    step.bucket(value).map(Bucket::value)
}

/// Which temperature-derived quantity drives bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempQuantity {
    /// `TEMP_OUT - TEMP_GATE`.
    DeltaT,
    TempOut,
    TempGate,
}

impl TempQuantity {
    pub const ALL: [TempQuantity; 3] = [
        TempQuantity::DeltaT,
        TempQuantity::TempOut,
        TempQuantity::TempGate,
    ];

    /// Short machine name used on the command line and in file names.
    pub fn as_str(self) -> &'static str {
        match self {
            TempQuantity::DeltaT => "delta_t",
            TempQuantity::TempOut => "temp_out",
            TempQuantity::TempGate => "temp_gate",
        }
    }
}

impl fmt::Display for TempQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TempQuantity::DeltaT => "∆T",
            TempQuantity::TempOut => "TEMP_OUT",
            TempQuantity::TempGate => "TEMP_GATE",
        };
        f.write_str(label)
    }
}

impl FromStr for TempQuantity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delta_t" | "delta-t" | "dt" => Ok(TempQuantity::DeltaT),
            "temp_out" | "temp-out" => Ok(TempQuantity::TempOut),
            "temp_gate" | "temp-gate" => Ok(TempQuantity::TempGate),
            other => Err(format!(
                "unknown temperature quantity \"{other}\", expected delta_t, temp_out or temp_gate"
            )),
        }
    }
}

/// Temperature values derived for one record after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TemperatureView {
    pub delta_t: Option<f64>,
    pub delta_t_rounded: Option<f64>,
    pub temp_out_rounded: Option<f64>,
    pub temp_gate_rounded: Option<f64>,
}

impl TemperatureView {
    pub fn from_record(record: &Record, step: RoundingStep) -> Self {
        let delta_t = match (record.temp_out, record.temp_gate) {
            (Some(out), Some(gate)) => Some(out - gate),
            _ => None,
        };
        Self {
            delta_t,
            delta_t_rounded: round_to(delta_t, step),
            temp_out_rounded: round_to(record.temp_out, step),
            temp_gate_rounded: round_to(record.temp_gate, step),
        }
    }

    /// The rounded value for a quantity.
    pub fn rounded(&self, quantity: TempQuantity) -> Option<f64> {
        match quantity {
            TempQuantity::DeltaT => self.delta_t_rounded,
            TempQuantity::TempOut => self.temp_out_rounded,
            TempQuantity::TempGate => self.temp_gate_rounded,
        }
    }
}

/// Computes the temperature view of every record, in dataset order.
pub fn transform(dataset: &Dataset, step: RoundingStep) -> Vec<TemperatureView> {
    dataset
        .records()
        .iter()
        .map(|r| TemperatureView::from_record(r, step))
        .collect()
}
