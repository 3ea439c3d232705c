//! In-memory engine used by tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{EngineEvent, ExecutionEngine};
use crate::config::RunConfiguration;
use crate::error::LoadError;
use crate::models::{SuiteDescriptor, TestModuleRef, TestOutcome};

/// Engine whose modules are declared up front as (suite title, test count)
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    available: HashMap<String, Vec<(String, usize)>>,
    registered: Vec<TestModuleRef>,
    suites: Vec<SuiteDescriptor>,
    /// Fail every test in suites with this title
    failing_suite: Option<String>,
    /// Close the channel without sending End
    drop_end: bool,
    disposed: Arc<AtomicBool>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn module(mut self, name: &str, suites: &[(&str, usize)]) -> Self {
        self.available.insert(
            name.to_string(),
            suites.iter().map(|(t, n)| (t.to_string(), *n)).collect(),
        );
        self
    }

    pub(crate) fn failing(mut self, suite_title: &str) -> Self {
        self.failing_suite = Some(suite_title.to_string());
        self
    }

    pub(crate) fn without_end(mut self) -> Self {
        self.drop_end = true;
        self
    }

    /// Flag set once the engine is disposed
    pub(crate) fn disposed(&self) -> Arc<AtomicBool> {
        self.disposed.clone()
    }

    pub(crate) fn registered(&self) -> Vec<TestModuleRef> {
        self.registered.clone()
    }

    /// Suites registered so far, root suite excluded
    pub(crate) fn suites(&self) -> Vec<SuiteDescriptor> {
        self.suites.clone()
    }
}

impl ExecutionEngine for ScriptedEngine {
    fn register(&mut self, module: &TestModuleRef) -> Result<usize, LoadError> {
        let suites = self
            .available
            .get(&module.to_string())
            .ok_or_else(|| LoadError::NotFound(module.to_string()))?;

        let mut count = 0;
        for (title, tests) in suites {
            let id = self.suites.len() + 1;
            let file = format!("/work/test/{module}");
            self.suites
                .push(SuiteDescriptor::new(id, title.clone(), *tests).with_file(file));
            count += tests;
        }
        self.registered.push(module.clone());
        Ok(count)
    }

    fn total_tests(&self) -> usize {
        self.suites.iter().map(|s| s.test_count).sum()
    }

    fn run(&mut self, _config: &RunConfiguration, events: mpsc::UnboundedSender<EngineEvent>) {
        let suites = self.suites.clone();
        let failing = self.failing_suite.clone();
        let drop_end = self.drop_end;

        tokio::spawn(async move {
            let _ = events.send(EngineEvent::Suite(SuiteDescriptor::new(0, "", 0)));
            for suite in suites {
                let _ = events.send(EngineEvent::Suite(suite.clone()));
                for n in 0..suite.test_count {
                    let title = format!("test {n}");
                    let outcome = if failing.as_deref() == Some(suite.title.as_str()) {
                        TestOutcome::failed(suite.id, title, 1, "assertion failed")
                    } else {
                        TestOutcome::passed(suite.id, title, 1)
                    };
                    let _ = events.send(EngineEvent::Test(outcome));
                    tokio::task::yield_now().await;
                }
            }
            if !drop_end {
                let _ = events.send(EngineEvent::End);
            }
        });
    }

    fn dispose(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}
