//! Error taxonomy for the analysis engine.
//!
//! Only structural problems are errors. Row-level data-quality issues become
//! `None` in typed fields, and missing Pre/Post groups are reported through
//! [`crate::engine::savings::SavingsOutcome`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::system::SystemId;

/// Fatal configuration problems surfaced to the caller immediately.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("required column '{column}' is missing from the dataset")]
    MissingColumn { column: String },
    #[error("rounding step must be a positive finite number, got {value}")]
    InvalidRoundingStep { value: f64 },
    #[error("temperature range is invalid: lo ({lo}) must be <= hi ({hi})")]
    InvalidRange { lo: f64, hi: f64 },
    #[error("unknown system '{system}'")]
    UnknownSystem { system: SystemId },
    #[error("no installation date configured for {system}")]
    MissingInstallationDate { system: SystemId },
    #[error("invalid installation date for '{key}': '{value}' (expected YYYY-MM-DD)")]
    InvalidInstallationDate { key: String, value: String },
    #[error("circuit list for '{key}' must be an array of column names")]
    InvalidCircuitList { key: String },
    #[error("invalid system definition: {message}")]
    InvalidSidecar { message: String },
}

/// Failures while reading the raw table or the system sidecar.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error in system definitions: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no '{extension}' file found in project directory {}", dir.display())]
    MissingProjectFile { dir: PathBuf, extension: String },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
