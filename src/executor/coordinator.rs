//! Run coordination
//!
//! Loads the configured modules, drives one engine run while relaying its
//! events, persists the run's artifact and finishes with a delayed
//! completion sequence.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{EngineEvent, ExecutionEngine, ModuleLoader};
use crate::config::{Backend, ExecutionMode, RunConfiguration};
use crate::error::HarnessError;
use crate::models::{ReportArtifact, TestModuleRef};
use crate::relay::{EventRelay, Flow, HostWindow, NotificationSink, SuiteNotice};
use crate::results::{
    format_summary, merge, RenderOptions, ReportBuilder, ReportRenderer, ReportStore,
};
use crate::utils::timer::{schedule_once, Timer};

/// Default delay between engine end and run completion
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(1000);

/// Starts runs against an engine and a subscriber
pub struct RunCoordinator {
    config: RunConfiguration,
    sink: Arc<dyn NotificationSink>,
    host: Arc<dyn HostWindow>,
    renderer: Arc<dyn ReportRenderer>,
    backend: Backend,
    mode: ExecutionMode,
    grace_period: Duration,
    prefix: String,
    host_label: String,
}

impl RunCoordinator {
    pub fn new(
        config: RunConfiguration,
        sink: Arc<dyn NotificationSink>,
        host: Arc<dyn HostWindow>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            config,
            sink,
            host,
            renderer,
            backend: Backend::default(),
            mode: ExecutionMode::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            prefix: String::new(),
            host_label: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Label attached to every suite notification
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_host_label(mut self, label: impl Into<String>) -> Self {
        self.host_label = label.into();
        self
    }

    /// Text of the title notification
    pub fn title(&self) -> String {
        format!("Running {} tests on {}", self.backend.label(), self.host_label)
    }

    /// Load `modules` into `engine` and start the run.
    ///
    /// Load errors are returned before any notification is sent. Must be
    /// called from within a tokio runtime.
    pub fn start(
        &self,
        modules: &[TestModuleRef],
        mut engine: Box<dyn ExecutionEngine>,
    ) -> Result<RunSession, HarnessError> {
        let total = ModuleLoader::new(modules.iter().cloned()).load(engine.as_mut())?;

        let relay = EventRelay::new(self.sink.clone(), self.prefix.clone());
        relay.title(self.title());

        let (tx, rx) = mpsc::unbounded_channel();
        engine.run(&self.config, tx);
        relay.tests_number(total);
        info!("Started run of {} tests ({})", total, self.backend);

        let state = Arc::new(Mutex::new(SessionState::default()));
        let driver = Driver {
            config: self.config.clone(),
            engine,
            relay,
            host: self.host.clone(),
            renderer: self.renderer.clone(),
            backend: self.backend,
            mode: self.mode,
            grace_period: self.grace_period,
            total,
            state: state.clone(),
        };
        let handle = tokio::spawn(driver.drive(rx));

        Ok(RunSession {
            total_tests: total,
            state,
            handle,
        })
    }
}

#[derive(Debug, Default)]
struct SessionState {
    suites: Vec<SuiteNotice>,
    margin: u32,
    completed: bool,
}

/// Handle on a started run
pub struct RunSession {
    total_tests: usize,
    state: Arc<Mutex<SessionState>>,
    handle: JoinHandle<RunOutcome>,
}

impl RunSession {
    pub fn total_tests(&self) -> usize {
        self.total_tests
    }

    /// Wait for the completion sequence to finish
    pub async fn wait(self) -> Result<RunOutcome, HarnessError> {
        self.handle
            .await
            .map_err(|e| HarnessError::Aborted(e.to_string()))
    }
}

#[cfg(test)]
impl RunSession {
    /// Suite notifications relayed so far, in order
    fn suites(&self) -> Vec<SuiteNotice> {
        lock(&self.state).suites.clone()
    }

    /// Margin the next suite notification will carry
    fn margin(&self) -> u32 {
        lock(&self.state).margin
    }

    /// True once the completion notification has been sent
    fn is_complete(&self) -> bool {
        lock(&self.state).completed
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// What a finished run left behind
#[derive(Debug)]
pub struct RunOutcome {
    pub artifact: ReportArtifact,
    /// Persisted artifact JSON, if saving succeeded
    pub artifact_path: Option<PathBuf>,
    /// Rendered per-run report, if rendering succeeded
    pub report_path: Option<PathBuf>,
    /// Suite notifications sent during the run
    pub suites: Vec<SuiteNotice>,
    /// False when the engine stream closed without an end event
    pub ended: bool,
}

impl RunOutcome {
    pub fn failures(&self) -> usize {
        self.artifact.stats.failures
    }
}

struct Driver {
    config: RunConfiguration,
    engine: Box<dyn ExecutionEngine>,
    relay: EventRelay,
    host: Arc<dyn HostWindow>,
    renderer: Arc<dyn ReportRenderer>,
    backend: Backend,
    mode: ExecutionMode,
    grace_period: Duration,
    total: usize,
    state: Arc<Mutex<SessionState>>,
}

impl Driver {
    async fn drive(mut self, mut events: mpsc::UnboundedReceiver<EngineEvent>) -> RunOutcome {
        let timer = Timer::start("run");
        let mut builder = ReportBuilder::new(&self.config, self.backend.label(), self.total);
        let mut ended = false;
        debug!("Run id {}", builder.run_id());

        while let Some(event) = events.recv().await {
            builder.apply(&event);
            let flow = self.relay.forward(&event);
            {
                let mut state = lock(&self.state);
                let seen = state.suites.len();
                state.suites.extend_from_slice(&self.relay.relayed()[seen..]);
                state.margin = self.relay.margin();
            }
            if flow == Flow::Ended {
                ended = true;
                break;
            }
        }
        if !ended {
            warn!("Engine stream closed without an end event");
        }
        debug!("Engine finished after {}ms", timer.elapsed_ms());

        let artifact = builder.finish();
        info!("{}", format_summary(&artifact.stats));
        let (artifact_path, report_path) = self.persist(&artifact);
        let suites = self.relay.relayed().to_vec();

        let Driver {
            config,
            mut engine,
            relay,
            host,
            mode,
            grace_period,
            state,
            ..
        } = self;

        let completion = schedule_once(grace_period, move || {
            engine.dispose();
            relay.run_complete(config.report_filename());
            lock(&state).completed = true;

            if mode.is_unattended() {
                if let Err(e) = host.close() {
                    warn!("Failed to close host window: {}", e);
                }
            }
        });
        if let Err(e) = completion.await {
            error!("Completion sequence failed: {}", e);
        }
        timer.stop();

        RunOutcome {
            artifact,
            artifact_path,
            report_path,
            suites,
            ended,
        }
    }

    /// Save the artifact JSON and render the run's own report.
    /// Failures are logged; the run still completes.
    fn persist(&self, artifact: &ReportArtifact) -> (Option<PathBuf>, Option<PathBuf>) {
        let store = ReportStore::new(self.config.report_dir());
        let artifact_path = match store.save_artifact(&self.config.artifact_filename(), artifact) {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Failed to save report artifact: {}", e);
                None
            }
        };

        let options = RenderOptions::new(
            self.config.report_dir(),
            self.config.report_filename(),
            self.config.report_title(),
        )
        .show_skipped(self.config.show_skipped());

        let report_path = merge([artifact.clone()])
            .map_err(|e| e.to_string())
            .and_then(|report| {
                self.renderer
                    .render(&report, &options)
                    .map_err(|e| e.to_string())
            });
        let report_path = match report_path {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to render run report: {}", e);
                None
            }
        };

        (artifact_path, report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{configure, RunOptions};
    use crate::executor::testing::ScriptedEngine;
    use crate::relay::testing::{Recorded, RecordingSink};
    use crate::relay::Notification;
    use crate::results::HtmlRenderer;
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;
    use tokio_test::assert_ok;

    fn config(dir: &Path) -> RunConfiguration {
        configure(RunOptions {
            report_filename: Some("test-results-coreclr.html".into()),
            report_dir: Some(dir.to_path_buf()),
            report_title: Some("electron-edge-js CoreCLR".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn coordinator(dir: &Path, sink: Arc<RecordingSink>) -> RunCoordinator {
        RunCoordinator::new(config(dir), sink.clone(), sink, Arc::new(HtmlRenderer))
            .with_backend(Backend::CoreClr)
            .with_host_label("Electron 30.0.0")
    }

    fn example_engine() -> ScriptedEngine {
        ScriptedEngine::new()
            .module("101_a.yaml", &[("a", 2)])
            .module("102_b.yaml", &[("b", 2)])
    }

    fn modules(names: &[&str]) -> Vec<TestModuleRef> {
        names.iter().map(|n| TestModuleRef::from(*n)).collect()
    }

    fn suites(sink: &RecordingSink) -> Vec<(String, u32)> {
        sink.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Suites(s) => Some((s.file, s.margin)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_run() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();

        let session = coordinator(dir.path(), sink.clone())
            .start(&modules(&["101_a.yaml", "102_b.yaml"]), Box::new(example_engine()))
            .unwrap();
        assert_eq!(session.total_tests(), 4);

        let outcome = assert_ok!(session.wait().await);
        assert!(outcome.ended);
        assert_eq!(outcome.artifact.stats.passes, 4);

        let notifications = sink.notifications();
        assert_eq!(
            notifications[0],
            Notification::Title("Running CoreCLR tests on Electron 30.0.0".into())
        );
        assert_eq!(notifications[1], Notification::TestsNumber(4));
        assert_eq!(
            suites(&sink),
            vec![("101_a.yaml".to_string(), 0), ("102_b.yaml".to_string(), 10)]
        );
        assert_eq!(
            notifications.last(),
            Some(&Notification::RunComplete("test-results-coreclr.html".into()))
        );

        assert!(dir.path().join("test-results-coreclr.json").exists());
        assert!(dir.path().join("test-results-coreclr.html").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_complete_waits_for_grace_period() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();

        let session = coordinator(dir.path(), sink.clone())
            .start(&modules(&["101_a.yaml"]), Box::new(example_engine()))
            .unwrap();
        session.wait().await.unwrap();

        let entries = sink.entries();
        let last_suite = entries
            .iter()
            .filter(|(_, r)| matches!(r, Recorded::Notification(Notification::Suites(_))))
            .map(|(at, _)| *at)
            .last()
            .unwrap();
        let (completed_at, _) = entries
            .iter()
            .find(|(_, r)| matches!(r, Recorded::Notification(Notification::RunComplete(_))))
            .unwrap();

        assert!(*completed_at - last_suite >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unattended_closes_after_run_complete() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();

        let session = coordinator(dir.path(), sink.clone())
            .with_mode(ExecutionMode::from_arg(Some("--CI")))
            .start(&modules(&["101_a.yaml"]), Box::new(example_engine()))
            .unwrap();
        session.wait().await.unwrap();

        let events = sink.events();
        assert_eq!(events.last(), Some(&Recorded::WindowClosed));
        assert!(matches!(
            events[events.len() - 2],
            Recorded::Notification(Notification::RunComplete(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactive_never_closes() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();

        let session = coordinator(dir.path(), sink.clone())
            .with_mode(ExecutionMode::from_arg(Some("ci")))
            .start(&modules(&["101_a.yaml"]), Box::new(example_engine()))
            .unwrap();
        session.wait().await.unwrap();

        assert!(!sink.events().contains(&Recorded::WindowClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_error_sends_nothing() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();

        let result = coordinator(dir.path(), sink.clone())
            .start(&modules(&["101_a.yaml", "missing.yaml"]), Box::new(example_engine()));

        assert!(matches!(result, Err(HarnessError::Load(_))));
        assert!(sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_without_end_still_completes() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();
        let engine = example_engine().without_end();
        let disposed = engine.disposed();

        let session = coordinator(dir.path(), sink.clone())
            .start(&modules(&["101_a.yaml"]), Box::new(engine))
            .unwrap();
        let outcome = session.wait().await.unwrap();

        assert!(!outcome.ended);
        assert!(disposed.load(Ordering::SeqCst));
        assert!(matches!(
            sink.notifications().last(),
            Some(Notification::RunComplete(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_subscriber_does_not_affect_run() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::failing();

        let session = coordinator(dir.path(), sink.clone())
            .with_mode(ExecutionMode::Unattended)
            .start(&modules(&["101_a.yaml", "102_b.yaml"]), Box::new(example_engine().failing("b")))
            .unwrap();
        let outcome = session.wait().await.unwrap();

        assert_eq!(outcome.failures(), 2);
        assert!(outcome.artifact_path.is_some());
        assert_eq!(sink.events().last(), Some(&Recorded::WindowClosed));
    }

    struct BrokenRenderer;

    impl ReportRenderer for BrokenRenderer {
        fn render(
            &self,
            _: &crate::models::MergedReport,
            options: &RenderOptions,
        ) -> Result<PathBuf, crate::error::RenderError> {
            Err(crate::error::RenderError::Exists(options.output_path()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_failure_keeps_artifact() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();

        let session = RunCoordinator::new(
            config(dir.path()),
            sink.clone(),
            sink.clone(),
            Arc::new(BrokenRenderer),
        )
        .start(&modules(&["101_a.yaml"]), Box::new(example_engine()))
        .unwrap();
        let outcome = session.wait().await.unwrap();

        assert!(outcome.report_path.is_none());
        assert_eq!(
            outcome.artifact_path,
            Some(dir.path().join("test-results-coreclr.json"))
        );
        assert!(matches!(
            sink.notifications().last(),
            Some(Notification::RunComplete(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_state_tracks_relay() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();

        let session = coordinator(dir.path(), sink.clone())
            .with_grace_period(Duration::from_millis(50))
            .start(&modules(&["101_a.yaml", "102_b.yaml"]), Box::new(example_engine()))
            .unwrap();
        assert!(!session.is_complete());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.suites().len(), 2);
        assert_eq!(session.margin(), 10);
        assert!(!session.is_complete());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(session.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relayed_suites_match_registered_modules() {
        let dir = tempdir().unwrap();
        let sink = RecordingSink::new();
        let engine = || {
            ScriptedEngine::new()
                .module("101_edge_func.yaml", &[("edge.func", 3), ("edge.func async", 2)])
                .module("102_marshal.yaml", &[("marshalling", 4)])
        };
        let names = modules(&["101_edge_func.yaml", "102_marshal.yaml"]);

        let mut registered = engine();
        for module in &names {
            registered.register(module).unwrap();
        }

        let session = coordinator(dir.path(), sink.clone())
            .start(&names, Box::new(engine()))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let relayed = session.suites();
        let outcome = session.wait().await.unwrap();

        // The root suite opens the stream but is never relayed
        let expected: Vec<(String, usize)> = registered
            .suites()
            .into_iter()
            .map(|s| (s.title, s.test_count))
            .collect();
        let actual: Vec<(String, usize)> = relayed
            .iter()
            .map(|n| (n.title.clone(), n.test_count))
            .collect();
        assert_eq!(actual, expected);
        assert_eq!(outcome.suites, relayed);
        assert_eq!(
            relayed.iter().map(|n| n.file.as_str()).collect::<Vec<_>>(),
            vec!["101_edge_func.yaml", "101_edge_func.yaml", "102_marshal.yaml"]
        );

        let relayed_total: usize = relayed.iter().map(|n| n.test_count).sum();
        assert_eq!(relayed_total, 9);
        assert!(sink
            .notifications()
            .contains(&Notification::TestsNumber(relayed_total)));
        assert_eq!(outcome.artifact.stats.tests, relayed_total);
    }
}
