//! Shell command execution engine
//!
//! A test module is a YAML or JSON manifest listing suites, each test being
//! a shell command. Exit status 0 passes; anything else, or running past the
//! per-test timeout, fails.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{EngineEvent, ExecutionEngine};
use crate::config::RunConfiguration;
use crate::error::LoadError;
use crate::models::{SuiteDescriptor, TestModuleRef, TestOutcome};
use crate::utils::timer::Timer;

/// Test module manifest
#[derive(Clone, Debug, Deserialize)]
pub struct Manifest {
    pub suites: Vec<ManifestSuite>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ManifestSuite {
    pub title: String,
    #[serde(default)]
    pub tests: Vec<ManifestTest>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ManifestTest {
    pub title: String,
    /// Test body; a test without one is reported as pending
    pub command: Option<String>,
    #[serde(default)]
    pub skip: bool,
}

impl ManifestTest {
    fn runnable(&self) -> Option<&str> {
        if self.skip {
            return None;
        }
        self.command.as_deref().filter(|c| !c.trim().is_empty())
    }
}

impl Manifest {
    /// Parse manifest content; `.json` files are JSON, everything else YAML
    pub fn parse(path: &Path, content: &str) -> Result<Self, String> {
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        }
    }
}

#[derive(Clone, Debug)]
struct LoadedSuite {
    descriptor: SuiteDescriptor,
    tests: Vec<ManifestTest>,
    /// Working directory for the suite's commands
    workdir: PathBuf,
}

/// Runs manifest tests as child processes, one at a time
pub struct CommandEngine {
    module_root: PathBuf,
    suites: Vec<LoadedSuite>,
    task: Option<JoinHandle<()>>,
}

impl CommandEngine {
    pub fn new(module_root: impl Into<PathBuf>) -> Self {
        Self {
            module_root: module_root.into(),
            suites: Vec::new(),
            task: None,
        }
    }

    pub fn module_root(&self) -> &Path {
        &self.module_root
    }

    fn read_manifest(&self, module: &TestModuleRef) -> Result<(PathBuf, Manifest), LoadError> {
        let path = module.resolve(&self.module_root);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.display().to_string()),
            _ => LoadError::Io {
                module: module.to_string(),
                source: e,
            },
        })?;

        let manifest = Manifest::parse(&path, &content).map_err(|reason| LoadError::Malformed {
            module: module.to_string(),
            reason,
        })?;
        Ok((path, manifest))
    }
}

impl ExecutionEngine for CommandEngine {
    fn register(&mut self, module: &TestModuleRef) -> Result<usize, LoadError> {
        let (path, manifest) = self.read_manifest(module)?;
        let workdir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.module_root.clone());
        let file = path.display().to_string();

        let mut count = 0;
        for suite in manifest.suites {
            // Id 0 is the root suite
            let id = self.suites.len() + 1;
            count += suite.tests.len();
            self.suites.push(LoadedSuite {
                descriptor: SuiteDescriptor::new(id, suite.title, suite.tests.len())
                    .with_file(file.clone()),
                tests: suite.tests,
                workdir: workdir.clone(),
            });
        }
        Ok(count)
    }

    fn total_tests(&self) -> usize {
        self.suites.iter().map(|s| s.tests.len()).sum()
    }

    fn run(&mut self, config: &RunConfiguration, events: mpsc::UnboundedSender<EngineEvent>) {
        let suites = self.suites.clone();
        let timeout = config.timeout();

        self.task = Some(tokio::spawn(async move {
            let timer = Timer::start("engine");
            let _ = events.send(EngineEvent::Suite(SuiteDescriptor::new(0, "", 0)));

            for suite in suites {
                let _ = events.send(EngineEvent::Suite(suite.descriptor.clone()));
                for test in &suite.tests {
                    let outcome =
                        run_test(suite.descriptor.id, test, &suite.workdir, timeout).await;
                    debug!("{} {}: {}", outcome.state.symbol(), suite.descriptor.title, outcome.title);
                    if events.send(EngineEvent::Test(outcome)).is_err() {
                        return;
                    }
                }
            }

            info!("Executed all suites in {}ms", timer.elapsed_ms());
            let _ = events.send(EngineEvent::End);
        }));
    }

    fn dispose(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Aborting unfinished engine task");
                task.abort();
            }
        }
    }
}

async fn run_test(
    suite_id: usize,
    test: &ManifestTest,
    workdir: &Path,
    timeout: Duration,
) -> TestOutcome {
    let Some(command) = test.runnable() else {
        return TestOutcome::pending(suite_id, test.title.clone());
    };

    let timer = Timer::start(test.title.clone());
    let mut child = shell(command);
    child
        .current_dir(workdir)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let result = tokio::time::timeout(timeout, child.output()).await;
    let duration_ms = timer.elapsed_ms();

    match result {
        Ok(Ok(output)) if output.status.success() => {
            TestOutcome::passed(suite_id, test.title.clone(), duration_ms)
        }
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            let error = if detail.is_empty() {
                format!("command failed: {}", output.status)
            } else {
                format!("command failed: {}\n{}", output.status, detail)
            };
            TestOutcome::failed(suite_id, test.title.clone(), duration_ms, error)
        }
        Ok(Err(e)) => TestOutcome::failed(
            suite_id,
            test.title.clone(),
            duration_ms,
            format!("failed to spawn command: {e}"),
        ),
        Err(_) => TestOutcome::failed(
            suite_id,
            test.title.clone(),
            duration_ms,
            format!("timeout of {}ms exceeded", timeout.as_millis()),
        ),
    }
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
