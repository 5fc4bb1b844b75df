//! Project directory loading.
//!
//! A project is a directory holding one raw table (`.csv`) and one system
//! sidecar (`.json`). Each is located by extension; when several files share
//! an extension the first in lexical order wins.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::data::parser::parse_path;
use crate::data::SystemSet;
use crate::engine::PreparedDataset;
use crate::error::DataError;

/// Paths of the two files making up a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFiles {
    pub data: PathBuf,
    pub systems: PathBuf,
}

impl ProjectFiles {
    /// Locates the raw table and sidecar inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns `DataError::Io` if the directory cannot be listed, or
    /// `DataError::MissingProjectFile` if either file is absent.
    pub fn locate(dir: &Path) -> Result<Self, DataError> {
        let entries = fs::read_dir(dir).map_err(|source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        Ok(Self {
            data: find_by_extension(dir, &files, "csv")?,
            systems: find_by_extension(dir, &files, "json")?,
        })
    }

    /// Parses both files and caches the per-system aggregation.
    ///
    /// # Errors
    ///
    /// Propagates parser and sidecar errors.
    pub fn load(&self) -> Result<PreparedDataset, DataError> {
        let dataset = parse_path(&self.data)?;
        let systems = SystemSet::from_json_file(&self.systems)?;
        info!(
            data = %self.data.display(),
            rows = dataset.len(),
            systems = systems.len(),
            "project loaded"
        );
        Ok(PreparedDataset::new(dataset, systems))
    }
}

fn find_by_extension(dir: &Path, files: &[PathBuf], extension: &str) -> Result<PathBuf, DataError> {
    let mut matches = files.iter().filter(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension))
    });
    let first = matches.next().ok_or_else(|| DataError::MissingProjectFile {
        dir: dir.to_path_buf(),
        extension: extension.to_string(),
    })?;
    if let Some(ignored) = matches.next() {
        warn!(
            using = %first.display(),
            ignored = %ignored.display(),
            "several .{extension} files in project directory"
        );
    }
    Ok(first.clone())
}

/// Loads the project in `dir`.
///
/// # Errors
///
/// See [`ProjectFiles::locate`] and [`ProjectFiles::load`].
pub fn load_project(dir: &Path) -> Result<PreparedDataset, DataError> {
    ProjectFiles::locate(dir)?.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SystemId;

    const CSV: &str = "\
TIME_STAMP,C_1,TEMP_OUT,TEMP_GATE
01/01/2024 10:00:00,5,30,20
01/02/2024 10:00:00,4,30,20
";

    const SIDECAR: &str = r#"{"System 1": ["C_1"], "Installation Date System 1": "2024-01-02"}"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "savings-analyzer-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn loads_csv_and_sidecar_by_extension() {
        let dir = scratch_dir("project-ok");
        fs::write(dir.join("readings.csv"), CSV).unwrap();
        fs::write(dir.join("systems.json"), SIDECAR).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let files = ProjectFiles::locate(&dir).unwrap();
        assert_eq!(files.data, dir.join("readings.csv"));

        let prepared = load_project(&dir).unwrap();
        assert_eq!(prepared.dataset().len(), 2);
        assert_eq!(
            prepared.systems().ids().collect::<Vec<_>>(),
            vec![SystemId(1)]
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_sidecar_names_extension() {
        let dir = scratch_dir("project-no-json");
        fs::write(dir.join("readings.csv"), CSV).unwrap();

        match ProjectFiles::locate(&dir) {
            Err(DataError::MissingProjectFile { extension, .. }) => assert_eq!(extension, "json"),
            other => panic!("expected MissingProjectFile, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = std::env::temp_dir().join("savings-analyzer-does-not-exist-7c1f");
        assert!(matches!(
            ProjectFiles::locate(&dir),
            Err(DataError::Io { .. })
        ));
    }
}
