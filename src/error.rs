//! Error taxonomy
//!
//! One error type per concern, gathered into [`HarnessError`] so the binary
//! can report which phase failed.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid or missing run options. Raised before any notification is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required option: {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("no test modules configured")]
    NoModules,
}

/// A test module could not be resolved into a loadable unit.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("test module not found: {0}")]
    NotFound(String),

    #[error("failed to read test module {module}: {source}")]
    Io {
        module: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed test module {module}: {reason}")]
    Malformed { module: String, reason: String },
}

/// The subscriber could not take a notification.
///
/// Never propagated out of the relay.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("subscriber disconnected")]
    Disconnected,

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Report store I/O failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid report JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid discovery pattern {pattern}: {reason}")]
    Pattern { pattern: String, reason: String },
}

/// Merge step failures.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("nothing to merge")]
    Empty,

    #[error("no report artifacts found matching {pattern} in {}", .dir.display())]
    NoArtifacts { pattern: String, dir: PathBuf },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The rendering collaborator failed. The persisted JSON is left in place.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("report already exists and overwrite is disabled: {}", .0.display())]
    Exists(PathBuf),

    #[error("failed to write report {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to format report: {0}")]
    Format(#[from] fmt::Error),
}

/// Phase in which a fatal error happened
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Run,
    Merge,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Run => write!(f, "load/run"),
            Phase::Merge => write!(f, "merge/render"),
        }
    }
}

/// Top-level error
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("report store error: {0}")]
    Store(#[from] StoreError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("run aborted: {0}")]
    Aborted(String),
}

impl HarnessError {
    /// The phase this error belongs to
    pub fn phase(&self) -> Phase {
        match self {
            HarnessError::Config(_)
            | HarnessError::Load(_)
            | HarnessError::Store(_)
            | HarnessError::Aborted(_) => Phase::Run,
            HarnessError::Merge(_) | HarnessError::Render(_) => Phase::Merge,
        }
    }
}
