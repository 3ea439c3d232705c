//! Recording subscriber used by tests

use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use super::{HostWindow, Notification, NotificationSink};
use crate::error::DeliveryError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Recorded {
    Notification(Notification),
    WindowClosed,
}

/// Records every notification and window close with the time it arrived
#[derive(Default)]
pub(crate) struct RecordingSink {
    log: Mutex<Vec<(Instant, Recorded)>>,
    failing: bool,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records attempts but reports every delivery as failed
    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(Vec::new()),
            failing: true,
        })
    }

    pub(crate) fn entries(&self) -> Vec<(Instant, Recorded)> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn events(&self) -> Vec<Recorded> {
        self.entries().into_iter().map(|(_, r)| r).collect()
    }

    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Notification(n) => Some(n),
                Recorded::WindowClosed => None,
            })
            .collect()
    }

    fn record(&self, entry: Recorded) -> Result<(), DeliveryError> {
        self.log.lock().unwrap().push((Instant::now(), entry));
        if self.failing {
            Err(DeliveryError::Disconnected)
        } else {
            Ok(())
        }
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.record(Recorded::Notification(notification.clone()))
    }
}

impl HostWindow for RecordingSink {
    fn close(&self) -> Result<(), DeliveryError> {
        self.record(Recorded::WindowClosed)
    }
}
