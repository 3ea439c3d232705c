//! Configuration module
//!
//! Handles loading the harness configuration file, reading the environment
//! once at startup, and validating per-run options.

mod env;
mod run;

pub use env::{Backend, EnvConfig};
pub use run::{configure, ExecutionMode, RunConfiguration, RunOptions};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;
use crate::models::TestModuleRef;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &["./run-relay.yaml", "./run-relay.yml", "./.run-relay.yaml"];

/// Harness configuration, built once at process start
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Project name used as the first word of report titles
    pub project: String,

    /// Host description shown in the run title
    pub host_label: String,

    /// Directory holding per-run and merged artifacts
    pub report_dir: PathBuf,

    /// Directory test module references are resolved against
    pub module_root: PathBuf,

    /// Ordered test modules; order is the display order
    pub modules: Vec<TestModuleRef>,

    /// Per-test timeout in milliseconds
    pub timeout_ms: u64,

    /// Show pending tests in rendered reports
    pub show_skipped: bool,

    /// Delay between engine end and run completion
    pub grace_period_ms: u64,

    /// Label sent with every suite notification
    pub suite_prefix: String,

    /// Glob used to discover artifacts for merging
    pub artifact_pattern: String,

    /// File stem of the merged artifact
    pub merged_report_name: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            project: "test-suite".to_string(),
            host_label: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            report_dir: PathBuf::from("test-report"),
            module_root: PathBuf::from("tests"),
            modules: Vec::new(),
            timeout_ms: 10_000,
            show_skipped: true,
            grace_period_ms: 1_000,
            suite_prefix: String::new(),
            artifact_pattern: "*.json".to_string(),
            merged_report_name: "merged-report".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        let user_config = dirs::config_dir().map(|d| d.join("run-relay").join("config.yaml"));

        CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .chain(user_config)
            .find(|path| path.exists())
    }

    /// Load from `path`, or the first standard location, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(Self::find) {
            Some(path) => Self::load(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides
    pub fn with_env(mut self, env: &EnvConfig) -> Self {
        if let Some(dir) = &env.report_dir {
            self.report_dir = dir.clone();
        }
        if let Some(grace) = env.grace_period_ms {
            self.grace_period_ms = grace;
        }
        self
    }

    /// Check the parts of the configuration a run depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modules.is_empty() {
            return Err(ConfigError::NoModules);
        }
        if self.merged_report_name.is_empty() {
            return Err(ConfigError::Missing("merged_report_name"));
        }
        Ok(())
    }

    /// Run options for the selected backend
    pub fn run_options(&self, backend: Backend) -> RunOptions {
        RunOptions {
            report_filename: Some(backend.report_filename()),
            report_dir: Some(self.report_dir.clone()),
            report_title: Some(format!("{} {}", self.project, backend.label())),
            timeout_ms: Some(self.timeout_ms),
            show_skipped: Some(self.show_skipped),
        }
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Path of the merged JSON artifact
    pub fn merged_json_path(&self) -> PathBuf {
        self.report_dir.join(format!("{}.json", self.merged_report_name))
    }

    /// Filename of the rendered merged report
    pub fn merged_html_name(&self) -> String {
        format!("{}.html", self.merged_report_name)
    }
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.grace_period_ms, 1_000);
        assert!(config.show_skipped);
        assert_eq!(config.suite_prefix, "");
        assert_eq!(config.merged_json_path(), PathBuf::from("test-report/merged-report.json"));
    }

    #[test]
    fn test_validate_requires_modules() {
        let config = HarnessConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::NoModules));

        let config = HarnessConfig {
            modules: vec!["101_edge_func.yaml".into()],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run-relay.yaml");

        let config = HarnessConfig {
            project: "electron-edge-js".to_string(),
            modules: vec!["101_edge_func.yaml".into(), "102_node2net.yaml".into()],
            ..Default::default()
        };
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.project, "electron-edge-js");
        assert_eq!(loaded.modules, config.modules);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"modules": ["a.yaml"], "timeout_ms": 500}"#).unwrap();

        let loaded = HarnessConfig::load(&path).unwrap();
        assert_eq!(loaded.timeout_ms, 500);
        assert_eq!(loaded.grace_period_ms, 1_000);
        assert_eq!(loaded.modules.len(), 1);
    }

    #[test]
    fn test_run_options_follow_backend() {
        let config = HarnessConfig {
            project: "electron-edge-js".to_string(),
            ..Default::default()
        };

        let options = config.run_options(Backend::CoreClr);
        assert_eq!(options.report_filename.as_deref(), Some("test-results-coreclr.html"));
        assert_eq!(options.report_title.as_deref(), Some("electron-edge-js CoreCLR"));
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvConfig {
            report_dir: Some(PathBuf::from("/tmp/reports")),
            grace_period_ms: Some(50),
            ..Default::default()
        };
        let config = HarnessConfig::default().with_env(&env);
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.grace_period(), Duration::from_millis(50));
    }
}
