//! Execution engine interface
//!
//! The engine owns test bodies and scheduling; the coordinator only sees
//! registration, the total test count and a stream of lifecycle events.

use tokio::sync::mpsc;

use crate::config::RunConfiguration;
use crate::error::LoadError;
use crate::models::{SuiteDescriptor, TestModuleRef, TestOutcome};

/// Lifecycle event emitted while a run executes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    Suite(SuiteDescriptor),
    Test(TestOutcome),
    /// Terminal event; nothing follows it
    End,
}

/// A backend able to load and execute test modules
pub trait ExecutionEngine: Send {
    /// Register one module without running it. Returns its test count.
    fn register(&mut self, module: &TestModuleRef) -> Result<usize, LoadError>;

    /// Tests across all registered modules
    fn total_tests(&self) -> usize;

    /// Start executing. Must not block; events are sent on `events` and the
    /// stream finishes with [`EngineEvent::End`].
    fn run(&mut self, config: &RunConfiguration, events: mpsc::UnboundedSender<EngineEvent>);

    /// Release resources held by the run
    fn dispose(&mut self);
}
