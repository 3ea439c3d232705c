//! Environment variable configuration
//!
//! Read once in `main`; nothing below the binary looks at the environment.

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::utils::logger::LogLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "RUN_RELAY";

/// Variable selecting the CoreCLR backend when set to a non-empty value
pub const BACKEND_VAR: &str = "EDGE_USE_CORECLR";

/// Execution backend governing a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Backend {
    CoreClr,
    /// .NET Framework on Windows, Mono elsewhere
    #[default]
    Framework,
}

impl Backend {
    /// Human readable label used in titles
    pub fn label(&self) -> &'static str {
        match self {
            Backend::CoreClr => "CoreCLR",
            Backend::Framework if cfg!(windows) => ".NET Framework 4.5",
            Backend::Framework => "Mono Framework",
        }
    }

    /// Suffix distinguishing per-run report files
    pub fn suffix(&self) -> &'static str {
        match self {
            Backend::CoreClr => "coreclr",
            Backend::Framework => "net",
        }
    }

    pub fn report_filename(&self) -> String {
        format!("test-results-{}.html", self.suffix())
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Backend from EDGE_USE_CORECLR
    pub backend: Backend,
    /// Config file from RUN_RELAY_CONFIG
    pub config_file: Option<PathBuf>,
    /// Report directory from RUN_RELAY_REPORT_DIR
    pub report_dir: Option<PathBuf>,
    /// Grace period from RUN_RELAY_GRACE_MS
    pub grace_period_ms: Option<u64>,
    /// Log level from RUN_RELAY_LOG
    pub log_level: Option<LogLevel>,
}

impl EnvConfig {
    /// Load configuration from the process environment
    pub fn load() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefixed = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        let backend = match lookup(BACKEND_VAR) {
            Some(v) if !v.is_empty() => Backend::CoreClr,
            _ => Backend::Framework,
        };

        Self {
            backend,
            config_file: prefixed("CONFIG").map(PathBuf::from),
            report_dir: prefixed("REPORT_DIR").map(PathBuf::from),
            grace_period_ms: prefixed("GRACE_MS").and_then(|v| v.parse().ok()),
            log_level: prefixed("LOG").and_then(|v| LogLevel::from_str(&v)),
        }
    }
}
