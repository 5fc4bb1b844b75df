//! Pre/Post installation classification.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::data::Dataset;

/// Whether a record precedes or follows a system's installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum InstallationType {
    PreInstallation,
    PostInstallation,
}

impl fmt::Display for InstallationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallationType::PreInstallation => "Pre Installation",
            InstallationType::PostInstallation => "Post Installation",
        })
    }
}

/// Classifies one timestamp against an installation date taken as midnight.
///
/// Post only when strictly after midnight of the install date; a null
/// timestamp is Pre.
pub fn classify_timestamp(
    timestamp: Option<&NaiveDateTime>,
    installation_date: NaiveDate,
) -> InstallationType {
    let cutoff = installation_date.and_time(chrono::NaiveTime::MIN);
    match timestamp {
        Some(ts) if *ts > cutoff => InstallationType::PostInstallation,
        _ => InstallationType::PreInstallation,
    }
}

/// Classifies every record, in dataset order.
pub fn classify(dataset: &Dataset, installation_date: NaiveDate) -> Vec<InstallationType> {
    dataset
        .records()
        .iter()
        .map(|r| classify_timestamp(r.timestamp.as_ref(), installation_date))
        .collect()
}
