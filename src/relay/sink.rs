//! Notification shapes and delivery transports

use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::DeliveryError;

/// Version of the line protocol written by [`JsonLinesSink`]
pub const PROTOCOL_VERSION: u8 = 1;

/// Payload of a `suites` notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteNotice {
    pub title: String,
    /// Basename of the originating module
    pub file: String,
    pub test_count: usize,
    pub margin: u32,
    pub prefix: String,
}

/// One-way message to the subscriber
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Title(String),
    TestsNumber(usize),
    Suites(SuiteNotice),
    RunComplete(String),
}

impl Notification {
    /// Subscriber channel the notification is published on
    pub fn channel(&self) -> &'static str {
        match self {
            Notification::RunComplete(_) => "runComplete",
            _ => "testResult",
        }
    }

    /// Positional payload. `testResult` messages lead with their name.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Notification::Title(text) => vec![json!("title"), json!(text)],
            Notification::TestsNumber(total) => vec![json!("testsNumber"), json!(total)],
            Notification::Suites(notice) => vec![
                json!("suites"),
                json!(""),
                json!(notice.title),
                json!(notice.file),
                json!(notice.test_count),
                json!(notice.margin),
                json!(notice.prefix),
            ],
            Notification::RunComplete(filename) => vec![json!(filename)],
        }
    }

    /// Short name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Title(_) => "title",
            Notification::TestsNumber(_) => "testsNumber",
            Notification::Suites(_) => "suites",
            Notification::RunComplete(_) => "runComplete",
        }
    }
}

/// Receives notifications. Implementations must not block the run.
pub trait NotificationSink: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Display host that can be told to close its window
pub trait HostWindow: Send + Sync {
    fn close(&self) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    v: u8,
    channel: &'a str,
    args: Vec<Value>,
}

/// Writes one JSON object per line, e.g. to stdout of a child process.
///
/// Lines are queued on an unbounded channel and written by a separate task,
/// so a reader that stops consuming never holds up the run.
pub struct JsonLinesSink {
    lines: mpsc::UnboundedSender<Vec<u8>>,
}

impl JsonLinesSink {
    /// Spawn the writer task. It ends once the sink is dropped and hands
    /// the writer back; after a write error every send is `Disconnected`.
    pub fn spawn<W>(writer: W) -> (Self, JoinHandle<io::Result<W>>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let handle = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(line) = rx.recv().await {
                writer.write_all(&line).await?;
                writer.flush().await?;
            }
            Ok(writer)
        });
        (Self { lines: tx }, handle)
    }

    fn queue(&self, envelope: &Envelope<'_>) -> Result<(), DeliveryError> {
        let mut line = serde_json::to_vec(envelope)?;
        line.push(b'\n');
        self.lines
            .send(line)
            .map_err(|_| DeliveryError::Disconnected)
    }
}

impl NotificationSink for JsonLinesSink {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.queue(&Envelope {
            v: PROTOCOL_VERSION,
            channel: notification.channel(),
            args: notification.args(),
        })
    }
}

impl HostWindow for JsonLinesSink {
    fn close(&self) -> Result<(), DeliveryError> {
        self.queue(&Envelope {
            v: PROTOCOL_VERSION,
            channel: "closeWindow",
            args: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> SuiteNotice {
        SuiteNotice {
            title: "edge.func".to_string(),
            file: "101_edge_func.yaml".to_string(),
            test_count: 2,
            margin: 10,
            prefix: String::new(),
        }
    }

    #[test]
    fn test_suites_args_are_positional() {
        let args = Notification::Suites(notice()).args();
        assert_eq!(
            args,
            vec![
                json!("suites"),
                json!(""),
                json!("edge.func"),
                json!("101_edge_func.yaml"),
                json!(2),
                json!(10),
                json!("")
            ]
        );
    }

    #[tokio::test]
    async fn test_json_lines_output() {
        let (sink, writer) = JsonLinesSink::spawn(Vec::new());
        sink.send(&Notification::Title("Running CoreCLR tests".into()))
            .unwrap();
        sink.send(&Notification::TestsNumber(4)).unwrap();
        sink.send(&Notification::RunComplete("test-results-net.html".into()))
            .unwrap();
        sink.close().unwrap();
        drop(sink);

        let output = String::from_utf8(writer.await.unwrap().unwrap()).unwrap();
        let lines: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["v"], json!(1));
        assert_eq!(lines[0]["channel"], json!("testResult"));
        assert_eq!(lines[0]["args"], json!(["title", "Running CoreCLR tests"]));
        assert_eq!(lines[1]["args"], json!(["testsNumber", 4]));
        assert_eq!(lines[2]["channel"], json!("runComplete"));
        assert_eq!(lines[2]["args"], json!(["test-results-net.html"]));
        assert_eq!(lines[3]["channel"], json!("closeWindow"));
    }

    #[tokio::test]
    async fn test_send_does_not_wait_for_writer() {
        // A writer whose reader never drains: a tiny duplex pipe
        let (stalled, _reader) = tokio::io::duplex(8);
        let (sink, writer) = JsonLinesSink::spawn(stalled);

        for n in 0..100 {
            sink.send(&Notification::TestsNumber(n)).unwrap();
        }
        assert!(!writer.is_finished());
    }

    #[tokio::test]
    async fn test_stopped_writer_is_disconnected() {
        let (sink, writer) = JsonLinesSink::spawn(Vec::new());
        writer.abort();
        let _ = writer.await;

        let err = sink.send(&Notification::TestsNumber(2)).unwrap_err();
        assert!(matches!(err, DeliveryError::Disconnected));
    }
}
