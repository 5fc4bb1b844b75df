//! Project loading and CSV export.

pub mod export;
pub mod project;
