//! Report merging
//!
//! Combines the artifacts of several runs into one aggregate, persists it
//! and hands it to the renderer.

use chrono::Utc;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::report::{RenderOptions, ReportRenderer};
use super::storage::ReportStore;
use crate::error::{HarnessError, MergeError, RenderError};
use crate::models::{MergedReport, ReportArtifact, ReportStats};

/// Identity of a run within a merge. Run ids are only unique per report
/// file, so backend and filename are part of the key.
type RunKey = (String, String, String);

fn run_key(artifact: &ReportArtifact) -> RunKey {
    (
        artifact.meta.run_id.clone(),
        artifact.meta.backend.clone(),
        artifact.meta.report_filename.clone(),
    )
}

/// Whether `candidate` replaces `existing` for the same run key: the later
/// end wins, ties go to the greater serialized form.
fn supersedes(candidate: &ReportArtifact, existing: &ReportArtifact) -> bool {
    match candidate.stats.end.cmp(&existing.stats.end) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            let encode = |a: &ReportArtifact| serde_json::to_string(a).unwrap_or_default();
            encode(candidate) > encode(existing)
        }
    }
}

/// Merge artifacts into one aggregate.
///
/// Artifacts are keyed by run id, backend and report filename, so the
/// result does not depend on input order and the same run given twice is
/// counted once.
pub fn merge<I>(artifacts: I) -> Result<MergedReport, MergeError>
where
    I: IntoIterator<Item = ReportArtifact>,
{
    let mut by_run: BTreeMap<RunKey, ReportArtifact> = BTreeMap::new();
    for artifact in artifacts {
        let key = run_key(&artifact);
        match by_run.get(&key) {
            Some(existing) if !supersedes(&artifact, existing) => {}
            _ => {
                by_run.insert(key, artifact);
            }
        }
    }

    let stats: Vec<&ReportStats> = by_run.values().map(|a| &a.stats).collect();
    let start = stats.iter().map(|s| s.start).min();
    let end = stats.iter().map(|s| s.end).max();
    let (Some(start), Some(end)) = (start, end) else {
        return Err(MergeError::Empty);
    };

    let merged_stats = ReportStats::from_counts(
        stats.iter().map(|s| s.suites).sum(),
        stats.iter().map(|s| s.passes).sum(),
        stats.iter().map(|s| s.failures).sum(),
        stats.iter().map(|s| s.pending).sum(),
        stats.iter().map(|s| s.tests_registered).sum(),
        start,
        end,
        stats.iter().map(|s| s.duration_ms).sum(),
    );

    let sources = by_run.values().map(|a| a.meta.clone()).collect();
    let results = by_run.into_values().flat_map(|a| a.results).collect();

    Ok(MergedReport {
        stats: merged_stats,
        results,
        sources,
        merged_at: Utc::now(),
    })
}

/// What a completed merge produced
#[derive(Debug)]
pub struct MergeOutcome {
    pub report: MergedReport,
    pub json_path: PathBuf,
    pub rendered: PathBuf,
}

/// Discovers, merges, persists and renders report artifacts
pub struct ReportMerger {
    store: ReportStore,
    pattern: String,
    destination: PathBuf,
}

impl ReportMerger {
    /// `destination` is the merged JSON path; it is never picked up by
    /// discovery even when it matches `pattern`.
    pub fn new(store: ReportStore, pattern: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            destination: destination.into(),
        }
    }

    /// Artifact paths matching the pattern, sorted
    pub fn discover(&self) -> Result<Vec<PathBuf>, MergeError> {
        let merged_name = self.destination.file_name().and_then(|n| n.to_str());
        let exclude: Vec<&str> = merged_name.into_iter().collect();
        Ok(self.store.discover(&self.pattern, &exclude)?)
    }

    /// Load every path, skipping files that are not valid artifacts
    pub fn load(&self, paths: &[PathBuf]) -> Vec<ReportArtifact> {
        paths
            .iter()
            .filter_map(|path| match self.store.load_artifact(path) {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }

    /// Discover and merge everything currently in the report directory
    pub fn merge_discovered(&self) -> Result<MergedReport, MergeError> {
        let paths = self.discover()?;
        let artifacts = self.load(&paths);
        if artifacts.is_empty() {
            return Err(MergeError::NoArtifacts {
                pattern: self.pattern.clone(),
                dir: self.store.base_dir().to_path_buf(),
            });
        }

        info!("Merging {} report artifacts", artifacts.len());
        merge(artifacts)
    }

    /// Write the aggregate to `destination`, overwriting
    pub fn persist(&self, report: &MergedReport, destination: &Path) -> Result<PathBuf, MergeError> {
        Ok(self.store.save_merged(destination, report)?)
    }

    pub fn render(
        &self,
        report: &MergedReport,
        renderer: &dyn ReportRenderer,
        options: &RenderOptions,
    ) -> Result<PathBuf, RenderError> {
        let path = renderer.render(report, options)?;
        info!("Rendered report to {}", path.display());
        Ok(path)
    }

    /// Render again from the persisted aggregate only
    pub fn rerender(
        &self,
        renderer: &dyn ReportRenderer,
        options: &RenderOptions,
    ) -> Result<PathBuf, HarnessError> {
        let report = self
            .store
            .load_merged(&self.destination)
            .map_err(MergeError::from)?;
        Ok(self.render(&report, renderer, options)?)
    }

    /// Full merge step. A render failure is returned after the JSON has
    /// been persisted, and leaves it in place.
    pub fn run(
        &self,
        renderer: &dyn ReportRenderer,
        options: &RenderOptions,
    ) -> Result<MergeOutcome, HarnessError> {
        let report = self.merge_discovered()?;
        let json_path = self.persist(&report, &self.destination)?;

        let rendered = self.render(&report, renderer, options).map_err(|e| {
            warn!(
                "Merged JSON kept at {}; rerun rendering once fixed",
                json_path.display()
            );
            e
        })?;

        Ok(MergeOutcome {
            report,
            json_path,
            rendered,
        })
    }
}
