//! Builds a run's report artifact from engine events

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

use crate::config::RunConfiguration;
use crate::executor::EngineEvent;
use crate::models::{ReportArtifact, ReportMeta, ReportStats, SuiteRecord, TestOutcome, TestRecord};
use crate::utils::path::display_name;

/// Accumulates suite and test records while a run executes
pub struct ReportBuilder {
    meta: ReportMeta,
    started_at: DateTime<Utc>,
    tests_registered: usize,
    suites: Vec<SuiteRecord>,
    /// Engine suite id -> index in `suites`
    index: HashMap<usize, usize>,
    next_test: usize,
}

impl ReportBuilder {
    pub fn new(config: &RunConfiguration, backend: &str, tests_registered: usize) -> Self {
        Self {
            meta: ReportMeta {
                run_id: generate_run_id(),
                title: config.report_title().to_string(),
                backend: backend.to_string(),
                report_filename: config.report_filename().to_string(),
                timeout_ms: config.timeout_ms(),
                show_skipped: config.show_skipped(),
                generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            },
            started_at: Utc::now(),
            tests_registered,
            suites: Vec::new(),
            index: HashMap::new(),
            next_test: 0,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.meta.run_id
    }

    /// Record one engine event
    pub fn apply(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Suite(suite) => {
                let uuid = format!("{}-s{}", self.meta.run_id, suite.id);
                self.index.insert(suite.id, self.suites.len());
                self.suites.push(SuiteRecord {
                    uuid,
                    title: suite.title.clone(),
                    file: suite.source_file().map(display_name).unwrap_or_default().to_string(),
                    tests: Vec::new(),
                    duration_ms: 0,
                });
            }
            EngineEvent::Test(outcome) => self.record(outcome),
            EngineEvent::End => {}
        }
    }

    fn record(&mut self, outcome: &TestOutcome) {
        let Some(&pos) = self.index.get(&outcome.suite_id) else {
            warn!(
                "Dropping result for unknown suite {}: {}",
                outcome.suite_id, outcome.title
            );
            return;
        };

        self.next_test += 1;
        let suite = &mut self.suites[pos];
        suite.duration_ms += outcome.duration_ms;
        suite.tests.push(TestRecord {
            uuid: format!("{}-t{}", self.meta.run_id, self.next_test),
            title: outcome.title.clone(),
            full_title: format!("{} {}", suite.title, outcome.title).trim().to_string(),
            state: outcome.state,
            duration_ms: outcome.duration_ms,
            err: outcome.error.clone(),
        });
    }

    /// Finish the artifact. Synthetic suites that hold no tests are dropped.
    pub fn finish(self) -> ReportArtifact {
        let results: Vec<SuiteRecord> = self
            .suites
            .into_iter()
            .filter(|s| !s.file.is_empty() || !s.tests.is_empty())
            .collect();

        let stats =
            ReportStats::from_results(&results, self.tests_registered, self.started_at, Utc::now());

        ReportArtifact {
            stats,
            results,
            meta: self.meta,
        }
    }
}

/// Generate unique run ID
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}
