//! Engine event to notification translation

use std::sync::Arc;
use tracing::{debug, warn};

use super::{Notification, NotificationSink, SuiteNotice};
use crate::executor::EngineEvent;
use crate::models::SuiteDescriptor;
use crate::utils::path::display_name;

/// Margin of every relayed suite after the first
pub const SUITE_MARGIN: u32 = 10;

/// What the caller should do after forwarding an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The engine finished; start the completion sequence
    Ended,
}

/// Forwards lifecycle events to a subscriber.
///
/// Delivery failures are logged and dropped so a subscriber outage never
/// affects the run.
pub struct EventRelay {
    sink: Arc<dyn NotificationSink>,
    prefix: String,
    margin: u32,
    relayed: Vec<SuiteNotice>,
}

impl EventRelay {
    pub fn new(sink: Arc<dyn NotificationSink>, prefix: impl Into<String>) -> Self {
        Self {
            sink,
            prefix: prefix.into(),
            margin: 0,
            relayed: Vec::new(),
        }
    }

    /// Margin the next relayed suite will carry
    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// Suite notifications sent so far, in order
    pub fn relayed(&self) -> &[SuiteNotice] {
        &self.relayed
    }

    pub fn title(&self, text: impl Into<String>) {
        self.notify(Notification::Title(text.into()));
    }

    pub fn tests_number(&self, total: usize) {
        self.notify(Notification::TestsNumber(total));
    }

    pub fn run_complete(&self, report_filename: impl Into<String>) {
        self.notify(Notification::RunComplete(report_filename.into()));
    }

    /// Relay a discovered suite. Suites without a file are not relayed.
    pub fn on_suite(&mut self, suite: &SuiteDescriptor) -> bool {
        let Some(file) = suite.source_file() else {
            debug!("Not relaying suite without file: {:?}", suite.title);
            return false;
        };

        let notice = SuiteNotice {
            title: suite.title.clone(),
            file: display_name(file).to_string(),
            test_count: suite.test_count,
            margin: self.margin,
            prefix: self.prefix.clone(),
        };
        self.notify(Notification::Suites(notice.clone()));

        self.margin = SUITE_MARGIN;
        self.relayed.push(notice);
        true
    }

    /// Forward one engine event
    pub fn forward(&mut self, event: &EngineEvent) -> Flow {
        match event {
            EngineEvent::Suite(suite) => {
                self.on_suite(suite);
                Flow::Continue
            }
            EngineEvent::Test(_) => Flow::Continue,
            EngineEvent::End => Flow::Ended,
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(e) = self.sink.send(&notification) {
            warn!("Dropped {} notification: {}", notification.name(), e);
        }
    }
}
