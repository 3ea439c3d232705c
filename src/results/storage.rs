//! Report store
//!
//! Reads and writes report artifacts as JSON under the report directory.

use globset::Glob;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{MergedReport, ReportArtifact};

/// Report storage rooted at one directory
#[derive(Clone, Debug)]
pub struct ReportStore {
    base_dir: PathBuf,
}

impl ReportStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Ensure storage directory exists
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir).map_err(|source| StoreError::Io {
            path: self.base_dir.clone(),
            source,
        })
    }

    /// Write a run artifact under `filename`, replacing any previous one
    pub fn save_artifact(
        &self,
        filename: &str,
        artifact: &ReportArtifact,
    ) -> Result<PathBuf, StoreError> {
        self.ensure_dir()?;
        let path = self.base_dir.join(filename);
        write_json(&path, artifact)?;
        info!("Saved report artifact to {}", path.display());
        Ok(path)
    }

    pub fn load_artifact(&self, path: &Path) -> Result<ReportArtifact, StoreError> {
        let artifact = read_json(path)?;
        debug!("Loaded report artifact from {}", path.display());
        Ok(artifact)
    }

    /// Write the merged aggregate to `path`, overwriting
    pub fn save_merged(&self, path: &Path, report: &MergedReport) -> Result<PathBuf, StoreError> {
        self.ensure_dir()?;
        write_json(path, report)?;
        info!("Saved merged report to {}", path.display());
        Ok(path.to_path_buf())
    }

    pub fn load_merged(&self, path: &Path) -> Result<MergedReport, StoreError> {
        read_json(path)
    }

    /// Files directly under the report directory whose name matches
    /// `pattern`, sorted by path. Names in `exclude` are skipped.
    pub fn discover(&self, pattern: &str, exclude: &[&str]) -> Result<Vec<PathBuf>, StoreError> {
        let matcher = Glob::new(pattern)
            .map_err(|e| StoreError::Pattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?
            .compile_matcher();

        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let io_err = |source| StoreError::Io {
            path: self.base_dir.clone(),
            source,
        };

        let mut found = Vec::new();
        for entry in fs::read_dir(&self.base_dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.file_type().map_err(io_err)?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if exclude.contains(&name) || !matcher.is_match(name) {
                continue;
            }
            found.push(entry.path());
        }

        found.sort();
        debug!(
            "Discovered {} artifacts matching {} in {}",
            found.len(),
            pattern,
            self.base_dir.display()
        );
        Ok(found)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
