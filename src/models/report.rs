//! Report artifact models
//!
//! Per-run artifacts and the merged aggregate share the same suite and test
//! records so a merged report preserves every individual result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of a test
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    Passed,
    Failed,
    Pending,
}

impl TestState {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestState::Passed => "✓",
            TestState::Failed => "✗",
            TestState::Pending => "○",
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestState::Passed => write!(f, "PASS"),
            TestState::Failed => write!(f, "FAIL"),
            TestState::Pending => write!(f, "PENDING"),
        }
    }
}

/// Stored test result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub uuid: String,
    pub title: String,
    /// Suite title and test title joined by a space
    pub full_title: String,
    pub state: TestState,
    pub duration_ms: u64,
    pub err: Option<String>,
}

/// Stored suite with its tests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteRecord {
    pub uuid: String,
    pub title: String,
    /// Module basename
    pub file: String,
    pub tests: Vec<TestRecord>,
    pub duration_ms: u64,
}

impl SuiteRecord {
    fn count(&self, state: TestState) -> usize {
        self.tests.iter().filter(|t| t.state == state).count()
    }
}

/// Aggregate counters over a set of suite records
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub suites: usize,
    pub tests: usize,
    pub passes: usize,
    pub pending: usize,
    pub failures: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: u64,
    /// Tests known at registration time, executed or not
    pub tests_registered: usize,
    pub pass_percent: f64,
    pub pending_percent: f64,
    /// Registered tests that never reported an outcome
    pub skipped: usize,
    pub has_skipped: bool,
}

impl ReportStats {
    /// Compute counters from suite records
    pub fn from_results(
        results: &[SuiteRecord],
        tests_registered: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let passes = results.iter().map(|s| s.count(TestState::Passed)).sum();
        let failures = results.iter().map(|s| s.count(TestState::Failed)).sum();
        let pending = results.iter().map(|s| s.count(TestState::Pending)).sum();
        let duration_ms = results.iter().map(|s| s.duration_ms).sum();

        Self::from_counts(
            results.len(),
            passes,
            failures,
            pending,
            tests_registered,
            start,
            end,
            duration_ms,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_counts(
        suites: usize,
        passes: usize,
        failures: usize,
        pending: usize,
        tests_registered: usize,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        let tests = passes + failures + pending;
        let skipped = tests_registered.saturating_sub(tests);

        Self {
            suites,
            tests,
            passes,
            pending,
            failures,
            start,
            end,
            duration_ms,
            tests_registered,
            pass_percent: percent(passes, tests_registered.saturating_sub(pending)),
            pending_percent: percent(pending, tests_registered),
            skipped,
            has_skipped: skipped > 0,
        }
    }
}

/// Percentage rounded to two decimals; 0 when the base is empty
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        ((part as f64 / whole as f64) * 10000.0).round() / 100.0
    }
}

/// Identity of the run that produced an artifact
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub run_id: String,
    pub title: String,
    /// Execution backend label
    pub backend: String,
    pub report_filename: String,
    pub timeout_ms: u64,
    pub show_skipped: bool,
    pub generator: String,
}

/// Persisted record of one completed run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub stats: ReportStats,
    pub results: Vec<SuiteRecord>,
    pub meta: ReportMeta,
}

/// Aggregate of several report artifacts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedReport {
    pub stats: ReportStats,
    pub results: Vec<SuiteRecord>,
    /// Meta of every merged artifact, ordered by run id
    pub sources: Vec<ReportMeta>,
    pub merged_at: DateTime<Utc>,
}

impl MergedReport {
    /// Compare two aggregates ignoring when they were produced
    #[cfg(test)]
    pub fn equivalent(&self, other: &MergedReport) -> bool {
        self.stats == other.stats && self.results == other.results && self.sources == other.sources
    }

    /// Distinct backends the aggregate was built from
    pub fn backends(&self) -> Vec<&str> {
        let mut backends: Vec<&str> = self.sources.iter().map(|m| m.backend.as_str()).collect();
        backends.sort_unstable();
        backends.dedup();
        backends
    }
}
