//! Pre/Post savings aggregation over rounded temperature buckets.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::classify::InstallationType;
use super::temperature::{Bucket, RoundingStep, TempQuantity};
use super::types::{AnalysisRecord, GroupStat, MeanAccumulator};
use crate::data::SystemId;
use crate::error::ConfigurationError;

/// Inclusive `[lo, hi]` restriction on a rounded temperature quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempRange {
    pub lo: f64,
    pub hi: f64,
}

impl TempRange {
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidRange` if a bound is NaN or
    /// `lo > hi`.
    pub fn new(lo: f64, hi: f64) -> Result<Self, ConfigurationError> {
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(ConfigurationError::InvalidRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// One temperature bucket of the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotRow {
    pub bucket: f64,
    pub pre: Option<GroupStat>,
    pub post: Option<GroupStat>,
}

/// Pivot of mean/count by (bucket, installation type), tagged by which
/// classification columns are populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum PivotResult {
    FullPrePost(Vec<PivotRow>),
    PreOnly(Vec<PivotRow>),
    PostOnly(Vec<PivotRow>),
    Empty,
}

impl PivotResult {
    fn from_rows(rows: Vec<PivotRow>) -> Self {
        let any_pre = rows.iter().any(|r| r.pre.is_some());
        let any_post = rows.iter().any(|r| r.post.is_some());
        match (any_pre, any_post) {
            (true, true) => PivotResult::FullPrePost(rows),
            (true, false) => PivotResult::PreOnly(rows),
            (false, true) => PivotResult::PostOnly(rows),
            (false, false) => PivotResult::Empty,
        }
    }

    pub fn rows(&self) -> &[PivotRow] {
        match self {
            PivotResult::FullPrePost(rows)
            | PivotResult::PreOnly(rows)
            | PivotResult::PostOnly(rows) => rows,
            PivotResult::Empty => &[],
        }
    }
}

/// Mean/count per installation type over the whole (range-restricted) set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassSummary {
    pub pre: Option<GroupStat>,
    pub post: Option<GroupStat>,
}

/// Why a savings percentage could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    NoRecords,
    NoPreInstallationRecords,
    NoPostInstallationRecords,
    ZeroPreInstallationMean,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnavailableReason::NoRecords => {
                "savings percentage could not be computed: zero records in both Pre and Post Installation"
            }
            UnavailableReason::NoPreInstallationRecords => {
                "savings percentage could not be computed: zero Pre Installation records"
            }
            UnavailableReason::NoPostInstallationRecords => {
                "savings percentage could not be computed: zero Post Installation records"
            }
            UnavailableReason::ZeroPreInstallationMean => {
                "savings percentage could not be computed: Pre Installation mean is zero"
            }
        })
    }
}

/// The savings scalar, or the reason it is missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SavingsOutcome {
    Available { pct: f64 },
    Unavailable { reason: UnavailableReason },
}

impl SavingsOutcome {
    pub fn pct(&self) -> Option<f64> {
        match self {
            SavingsOutcome::Available { pct } => Some(*pct),
            SavingsOutcome::Unavailable { .. } => None,
        }
    }

    fn from_summary(summary: &ClassSummary) -> Self {
        let reason = match (summary.pre, summary.post) {
            (Some(pre), Some(post)) => {
                if pre.mean_kw == 0.0 {
                    UnavailableReason::ZeroPreInstallationMean
                } else {
                    let pct = (pre.mean_kw - post.mean_kw) / pre.mean_kw * 100.0;
                    return SavingsOutcome::Available { pct };
                }
            }
            (None, None) => UnavailableReason::NoRecords,
            (None, Some(_)) => UnavailableReason::NoPreInstallationRecords,
            (Some(_), None) => UnavailableReason::NoPostInstallationRecords,
        };
        SavingsOutcome::Unavailable { reason }
    }
}

/// Pivot, summary and savings for one system and one temperature quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsResult {
    pub system: SystemId,
    pub quantity: TempQuantity,
    pub range: Option<TempRange>,
    pub pivot: PivotResult,
    pub summary: ClassSummary,
    pub savings: SavingsOutcome,
}

/// Aggregates annotated records into a [`SavingsResult`].
///
/// Records whose rounded quantity is null, or falls outside `range`, take
/// part in neither the pivot nor the summary. Null load averages are skipped
/// by the mean and count. Never mutates `records`.
pub fn compute_savings(
    system: SystemId,
    records: &[AnalysisRecord],
    quantity: TempQuantity,
    step: RoundingStep,
    range: Option<TempRange>,
) -> SavingsResult {
    let mut buckets: BTreeMap<Bucket, (MeanAccumulator, MeanAccumulator)> = BTreeMap::new();
    let mut pre_total = MeanAccumulator::default();
    let mut post_total = MeanAccumulator::default();

    for r in records {
        let Some(value) = r.temperature.rounded(quantity) else {
            continue;
        };
        if range.is_some_and(|rg| !rg.contains(value)) {
            continue;
        }
        let Some(bucket) = step.bucket(Some(value)) else {
            continue;
        };
        let (pre, post) = buckets.entry(bucket).or_default();
        match r.installation {
            InstallationType::PreInstallation => {
                pre.push(r.kw_sum_average);
                pre_total.push(r.kw_sum_average);
            }
            InstallationType::PostInstallation => {
                post.push(r.kw_sum_average);
                post_total.push(r.kw_sum_average);
            }
        }
    }

    let rows: Vec<PivotRow> = buckets
        .into_iter()
        .filter_map(|(bucket, (pre, post))| {
            let row = PivotRow {
                bucket: bucket.value(),
                pre: pre.finish(),
                post: post.finish(),
            };
            (row.pre.is_some() || row.post.is_some()).then_some(row)
        })
        .collect();

    let summary = ClassSummary {
        pre: pre_total.finish(),
        post: post_total.finish(),
    };
    let savings = SavingsOutcome::from_summary(&summary);

    SavingsResult {
        system,
        quantity,
        range,
        pivot: PivotResult::from_rows(rows),
        summary,
        savings,
    }
}

impl fmt::Display for SavingsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} Pre/Post Installation on {} ---", self.system, self.quantity)?;
        if let Some(rg) = self.range {
            writeln!(f, "Range:        [{:.2}, {:.2}]", rg.lo, rg.hi)?;
        }
        writeln!(
            f,
            "{:>10} | {:>12} {:>9} | {:>12} {:>9}",
            "bucket", "avg_kwh_pre", "count_pre", "avg_kwh_post", "count_post"
        )?;
        for row in self.pivot.rows() {
            let (pre_mean, pre_n) = stat_cells(row.pre);
            let (post_mean, post_n) = stat_cells(row.post);
            writeln!(
                f,
                "{:>10.2} | {pre_mean:>12} {pre_n:>9} | {post_mean:>12} {post_n:>9}",
                row.bucket
            )?;
        }
        if let Some(pre) = self.summary.pre {
            writeln!(f, "Pre Installation:   {pre}")?;
        }
        if let Some(post) = self.summary.post {
            writeln!(f, "Post Installation:  {post}")?;
        }
        match self.savings {
            SavingsOutcome::Available { pct } => write!(f, "TOTAL SAVINGS: {pct:.2}%"),
            SavingsOutcome::Unavailable { reason } => write!(f, "{reason}"),
        }
    }
}

fn stat_cells(stat: Option<GroupStat>) -> (String, String) {
    match stat {
        Some(s) => (format!("{:.3}", s.mean_kw), s.count.to_string()),
        None => ("-".to_string(), "-".to_string()),
    }
}
