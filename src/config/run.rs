//! Per-run options and execution mode

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Raw options as supplied by the caller
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    pub report_filename: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub report_title: Option<String>,
    pub timeout_ms: Option<u64>,
    pub show_skipped: Option<bool>,
}

/// Validated, immutable configuration of one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfiguration {
    report_filename: String,
    report_dir: PathBuf,
    report_title: String,
    timeout_ms: u64,
    show_skipped: bool,
}

impl RunConfiguration {
    pub fn report_filename(&self) -> &str {
        &self.report_filename
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn report_title(&self) -> &str {
        &self.report_title
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn show_skipped(&self) -> bool {
        self.show_skipped
    }

    /// Name of the JSON artifact written next to the rendered report
    pub fn artifact_filename(&self) -> String {
        let stem = Path::new(&self.report_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.report_filename);
        format!("{stem}.json")
    }
}

/// Validate options into a [`RunConfiguration`]
pub fn configure(options: RunOptions) -> Result<RunConfiguration, ConfigError> {
    let report_filename = required(options.report_filename, "report_filename")?;
    if report_filename.contains(['/', '\\']) {
        return Err(ConfigError::Invalid {
            field: "report_filename",
            reason: format!("{report_filename:?} must be a bare file name"),
        });
    }

    let report_dir = options
        .report_dir
        .filter(|d| !d.as_os_str().is_empty())
        .ok_or(ConfigError::Missing("report_dir"))?;
    let report_title = required(options.report_title, "report_title")?;

    let timeout_ms = options.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(ConfigError::Invalid {
            field: "timeout_ms",
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(RunConfiguration {
        report_filename,
        report_dir,
        report_title,
        timeout_ms,
        show_skipped: options.show_skipped.unwrap_or(true),
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(field))
}

/// Whether the host window closes itself after the run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// CI: close the window once the run is complete
    Unattended,
    #[default]
    Interactive,
}

impl ExecutionMode {
    /// Parse the positional mode argument. Leading dashes are stripped and
    /// the rest must be exactly `CI`.
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg.map(|a| a.trim_start_matches('-')) {
            Some("CI") => ExecutionMode::Unattended,
            _ => ExecutionMode::Interactive,
        }
    }

    pub fn is_unattended(&self) -> bool {
        matches!(self, ExecutionMode::Unattended)
    }
}
