//! Input model: raw records, parsing, and system definitions.

/// Raw table parsing.
pub mod parser;
pub mod record;
/// Circuit-to-system mapping and installation dates.
pub mod system;

pub use record::{Dataset, ExclusionOptions, Record, Schema, TimeParts};
pub use system::{System, SystemId, SystemSet};
