//! Artifact fixtures shared by report tests

use chrono::{TimeZone, Utc};

use crate::models::{ReportArtifact, ReportMeta, ReportStats, SuiteRecord, TestRecord, TestState};

/// Artifact with one suite per `(file, passing tests)` pair
pub(crate) fn artifact(run_id: &str, suites: &[(&str, usize)]) -> ReportArtifact {
    let results: Vec<SuiteRecord> = suites
        .iter()
        .enumerate()
        .map(|(i, (file, count))| SuiteRecord {
            uuid: format!("{run_id}-s{i}"),
            title: format!("suite {file}"),
            file: file.to_string(),
            tests: (0..*count)
                .map(|n| TestRecord {
                    uuid: format!("{run_id}-s{i}-t{n}"),
                    title: format!("test {n}"),
                    full_title: format!("suite {file} test {n}"),
                    state: TestState::Passed,
                    duration_ms: 5,
                    err: None,
                })
                .collect(),
            duration_ms: 5 * *count as u64,
        })
        .collect();

    let registered = suites.iter().map(|(_, n)| n).sum();
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 1, 1, 12, 5, 0).unwrap();

    ReportArtifact {
        stats: ReportStats::from_results(&results, registered, start, end),
        results,
        meta: ReportMeta {
            run_id: run_id.to_string(),
            title: "suite CoreCLR".to_string(),
            backend: "CoreCLR".to_string(),
            report_filename: format!("test-results-{run_id}.html"),
            timeout_ms: 10_000,
            show_skipped: true,
            generator: "run-relay test".to_string(),
        },
    }
}
