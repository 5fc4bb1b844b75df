//! End-to-end analysis: filter, transform, classify and aggregate.
//!
//! Parsing and per-system aggregation depend only on the raw table and the
//! system definitions, so [`PreparedDataset`] computes them once and every
//! [`PreparedDataset::analyze`] call recomputes the rest from scratch.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::aggregate::{LoadProfile, SystemLoad, aggregate_all, aggregate_system};
use super::breakdown::Breakdown;
use super::classify::{self, InstallationType};
use super::filter::{ExclusionSpec, FilterSummary};
use super::savings::{SavingsResult, TempRange, compute_savings};
use super::temperature::{self, RoundingStep, TempQuantity};
use super::types::AnalysisRecord;
use crate::data::{Dataset, System, SystemId, SystemSet};
use crate::error::ConfigurationError;

/// Everything one analysis invocation needs besides the data.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub system: SystemId,
    pub exclusions: ExclusionSpec,
    pub step: RoundingStep,
    pub quantity: TempQuantity,
    pub range: Option<TempRange>,
    /// Replaces the system's configured installation date when set.
    pub installation_date: Option<NaiveDate>,
}

impl AnalysisRequest {
    /// A request with no exclusions, the default step, `∆T`, and no range.
    pub fn new(system: SystemId) -> Self {
        Self {
            system,
            exclusions: ExclusionSpec::default(),
            step: RoundingStep::default(),
            quantity: TempQuantity::DeltaT,
            range: None,
            installation_date: None,
        }
    }
}

/// Output of one analysis invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub system: SystemId,
    pub installation_date: NaiveDate,
    pub step: RoundingStep,
    pub filter: FilterSummary,
    /// Filtered records annotated for this system, in raw-table order.
    pub records: Vec<AnalysisRecord>,
    pub breakdown: Breakdown,
    pub savings: SavingsResult,
}

impl AnalysisResult {
    /// Re-aggregates the annotated records for another quantity or range.
    pub fn savings_for(&self, quantity: TempQuantity, range: Option<TempRange>) -> SavingsResult {
        compute_savings(self.system, &self.records, quantity, self.step, range)
    }

    /// Savings for a quantity as reported: the requested range applies to
    /// the requested quantity only.
    pub fn report_for(&self, quantity: TempQuantity) -> SavingsResult {
        let range = self.savings.range.filter(|_| quantity == self.savings.quantity);
        self.savings_for(quantity, range)
    }

    /// Smallest and largest rounded value of a quantity, if any is non-null.
    pub fn quantity_bounds(&self, quantity: TempQuantity) -> Option<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.temperature.rounded(quantity))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Number of display pages for a page size; always at least one.
    pub fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 1;
        }
        self.records.len() / page_size + 1
    }

    /// Records on a 1-based page; empty past the end.
    pub fn page(&self, page_size: usize, page: usize) -> &[AnalysisRecord] {
        let start = page.saturating_sub(1).saturating_mul(page_size);
        if start >= self.records.len() {
            return &[];
        }
        let end = start.saturating_add(page_size).min(self.records.len());
        &self.records[start..end]
    }
}

/// Raw dataset plus its cached per-system load profiles.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    dataset: Dataset,
    systems: SystemSet,
    profiles: BTreeMap<SystemId, LoadProfile>,
}

impl PreparedDataset {
    pub fn new(dataset: Dataset, systems: SystemSet) -> Self {
        let profiles = aggregate_all(&dataset, &systems);
        Self {
            dataset,
            systems,
            profiles,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn systems(&self) -> &SystemSet {
        &self.systems
    }

    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownSystem` for an undefined system.
    pub fn profile(&self, id: SystemId) -> Result<&LoadProfile, ConfigurationError> {
        self.profiles
            .get(&id)
            .ok_or(ConfigurationError::UnknownSystem { system: id })
    }

    /// Runs the analysis stages for one request over the cached profiles.
    ///
    /// # Errors
    ///
    /// See [`analyze`].
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ConfigurationError> {
        let system = self.systems.get(request.system)?;
        let profile = self.profile(request.system)?;
        run_stages(&self.dataset, system, profile, request)
    }
}

/// Runs the full pipeline for one system without any cached state.
///
/// # Errors
///
/// Returns `ConfigurationError::UnknownSystem` if the system is not defined,
/// or `ConfigurationError::MissingInstallationDate` if neither the request
/// nor the system carries an installation date.
pub fn analyze(
    dataset: &Dataset,
    systems: &SystemSet,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, ConfigurationError> {
    let system = systems.get(request.system)?;
    let profile = aggregate_system(dataset, system);
    run_stages(dataset, system, &profile, request)
}

fn run_stages(
    dataset: &Dataset,
    system: &System,
    profile: &LoadProfile,
    request: &AnalysisRequest,
) -> Result<AnalysisResult, ConfigurationError> {
    let installation_date = request
        .installation_date
        .or(system.installation_date)
        .ok_or(ConfigurationError::MissingInstallationDate { system: system.id })?;

    let (filtered, filter) = request.exclusions.apply_with_summary(dataset);
    let temps = temperature::transform(&filtered, request.step);
    let classes = classify::classify(&filtered, installation_date);

    let records: Vec<AnalysisRecord> = filtered
        .records()
        .iter()
        .zip(temps)
        .zip(classes)
        .map(|((r, temperature), installation)| {
            let load = profile.at(r.row).copied().unwrap_or(SystemLoad {
                kw_sum: 0.0,
                kw_sum_average: None,
            });
            AnalysisRecord {
                row: r.row,
                timestamp: r.timestamp,
                time: r.time,
                kw_sum: load.kw_sum,
                kw_sum_average: load.kw_sum_average,
                temp_out: r.temp_out,
                temp_gate: r.temp_gate,
                temperature,
                installation,
            }
        })
        .collect();

    let breakdown = Breakdown::from_records(&records);
    let savings = compute_savings(
        system.id,
        &records,
        request.quantity,
        request.step,
        request.range,
    );

    let post = records
        .iter()
        .filter(|r| r.installation == InstallationType::PostInstallation)
        .count();
    info!(
        system = %system.id,
        retained = filter.retained,
        removed = filter.removed,
        pre = records.len() - post,
        post,
        savings_pct = ?savings.savings.pct(),
        "analysis complete"
    );

    Ok(AnalysisResult {
        system: system.id,
        installation_date,
        step: request.step,
        filter,
        records,
        breakdown,
        savings,
    })
}
