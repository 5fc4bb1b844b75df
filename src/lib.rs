//! Energy savings analysis for retrofitted HVAC systems.
//!
//! A raw table of circuit power readings and temperatures is combined with
//! per-system installation dates to compare mean load before and after each
//! installation, bucketed by rounded temperature.

/// REST surface over a loaded project.
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod io;
pub mod synth;
