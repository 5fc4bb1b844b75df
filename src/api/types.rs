//! API response and query types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{System, SystemId};
use crate::engine::savings::{ClassSummary, PivotResult, SavingsResult, TempRange};
use crate::engine::{AnalysisResult, FilterSummary, SavingsOutcome, TempQuantity};

/// One entry of the `/systems` listing.
#[derive(Debug, Serialize)]
pub struct SystemSummary {
    pub system: SystemId,
    pub circuits: Vec<String>,
    pub installation_date: Option<NaiveDate>,
}

impl From<&System> for SystemSummary {
    fn from(s: &System) -> Self {
        Self {
            system: s.id,
            circuits: s.circuits.clone(),
            installation_date: s.installation_date,
        }
    }
}

/// Optional overrides for the analysis endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    /// `delta_t`, `temp_out` or `temp_gate`.
    pub quantity: Option<String>,
    /// Rounding step override.
    pub m_round: Option<f64>,
    /// Inclusive lower bound; defaults to the smallest rounded value.
    pub lo: Option<f64>,
    /// Inclusive upper bound; defaults to the largest rounded value.
    pub hi: Option<f64>,
}

/// Savings analysis of one system for one quantity.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub system: SystemId,
    pub installation_date: NaiveDate,
    pub m_round: f64,
    pub quantity: TempQuantity,
    pub range: Option<TempRange>,
    pub filter: FilterSummary,
    pub pivot: PivotResult,
    pub summary: ClassSummary,
    pub savings: SavingsOutcome,
    /// Savings rendered to two decimals, or the reason it is unavailable.
    pub savings_display: String,
}

impl AnalysisResponse {
    pub fn new(result: &AnalysisResult, savings: SavingsResult) -> Self {
        let savings_display = match savings.savings {
            SavingsOutcome::Available { pct } => format!("{pct:.2}%"),
            SavingsOutcome::Unavailable { reason } => reason.to_string(),
        };
        Self {
            system: result.system,
            installation_date: result.installation_date,
            m_round: result.step.value(),
            quantity: savings.quantity,
            range: savings.range,
            filter: result.filter,
            pivot: savings.pivot,
            summary: savings.summary,
            savings: savings.savings,
            savings_display,
        }
    }
}

/// Error response body for 4xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
