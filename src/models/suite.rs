//! Suite and test lifecycle values produced by the execution engine

use serde::{Deserialize, Serialize};

use super::TestState;

/// A suite as discovered by the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDescriptor {
    /// Engine-assigned id, unique within a run
    pub id: usize,
    pub title: String,
    /// Originating module file. `None` for synthetic suites such as the root.
    pub file: Option<String>,
    /// Number of tests directly in this suite
    pub test_count: usize,
}

impl SuiteDescriptor {
    pub fn new(id: usize, title: impl Into<String>, test_count: usize) -> Self {
        Self {
            id,
            title: title.into(),
            file: None,
            test_count,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Originating file, if the suite has a non-empty one
    pub fn source_file(&self) -> Option<&str> {
        self.file.as_deref().filter(|f| !f.is_empty())
    }
}

/// Result of one executed (or skipped) test
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Id of the owning [`SuiteDescriptor`]
    pub suite_id: usize,
    pub title: String,
    pub state: TestState,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl TestOutcome {
    pub fn passed(suite_id: usize, title: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            suite_id,
            title: title.into(),
            state: TestState::Passed,
            duration_ms,
            error: None,
        }
    }

    pub fn failed(
        suite_id: usize,
        title: impl Into<String>,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            suite_id,
            title: title.into(),
            state: TestState::Failed,
            duration_ms,
            error: Some(error.into()),
        }
    }

    pub fn pending(suite_id: usize, title: impl Into<String>) -> Self {
        Self {
            suite_id,
            title: title.into(),
            state: TestState::Pending,
            duration_ms: 0,
            error: None,
        }
    }
}
