//! Subscriber notification relay
//!
//! Normalizes engine lifecycle events into the notification shape the
//! observer process understands and delivers them fire-and-forget.

mod events;
mod sink;
#[cfg(test)]
pub(crate) mod testing;

pub use events::{EventRelay, Flow};
pub use sink::{HostWindow, JsonLinesSink, Notification, NotificationSink, SuiteNotice};
