//! Analysis pipeline stages.

/// Per-system `KW_SUM` and hourly smoothing.
pub mod aggregate;
pub mod breakdown;
/// Pre/Post installation labelling.
pub mod classify;
/// Calendar exclusion filter.
pub mod filter;
pub mod pipeline;
pub mod savings;
/// Temperature differential and bucketing.
pub mod temperature;
pub mod types;

pub use classify::InstallationType;
pub use filter::{ExclusionSpec, FilterSummary};
pub use pipeline::{AnalysisRequest, AnalysisResult, PreparedDataset, analyze};
pub use savings::{PivotResult, SavingsOutcome, SavingsResult, TempRange};
pub use temperature::{RoundingStep, TempQuantity};
