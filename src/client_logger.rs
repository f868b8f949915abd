//! Logging trait for agent client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every run request and every stream event passing through an
//! [`AgentClient`](crate::AgentClient), and [`JsonlClientLogger`], which appends
//! them to a JSON-lines file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{AgentEvent, Error, Result, RunAgentInput};

/// A trait for logging agent client operations.
pub trait ClientLogger: Send + Sync {
    /// Log a run request before it is sent.
    fn log_run_input(&self, input: &RunAgentInput);

    /// Log an individual stream event as it is decoded.
    fn log_event(&self, run_id: &str, event: &AgentEvent);
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LogRecord<'a> {
    Request {
        #[serde(with = "crate::utils::time")]
        timestamp: OffsetDateTime,
        input: &'a RunAgentInput,
    },
    Event {
        #[serde(with = "crate::utils::time")]
        timestamp: OffsetDateTime,
        run_id: &'a str,
        event: &'a AgentEvent,
    },
}

/// Appends one JSON object per request or event to a file.
pub struct JsonlClientLogger {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlClientLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| Error::io(format!("failed to open {}", path.display()), err))?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// The file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, record: &LogRecord<'_>) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "could not serialize client log record");
                return;
            }
        };
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if let Err(err) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            tracing::warn!(path = %self.path.display(), error = %err, "could not write client log");
        }
    }
}

impl ClientLogger for JsonlClientLogger {
    fn log_run_input(&self, input: &RunAgentInput) {
        self.write_record(&LogRecord::Request {
            timestamp: OffsetDateTime::now_utc(),
            input,
        });
    }

    fn log_event(&self, run_id: &str, event: &AgentEvent) {
        self.write_record(&LogRecord::Event {
            timestamp: OffsetDateTime::now_utc(),
            run_id,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_record() {
        let path = std::env::temp_dir().join(format!("aula-client-log-{}.jsonl", uuid::Uuid::new_v4()));
        let logger = JsonlClientLogger::open(&path).unwrap();
        logger.log_run_input(&RunAgentInput::new("t", "r", vec![], vec![]));
        logger.log_event(
            "r",
            &AgentEvent::TextMessageEnd {
                message_id: "m".to_string(),
            },
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "request");
        assert_eq!(first["input"]["threadId"], "t");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "event");
        assert_eq!(second["run_id"], "r");
        assert_eq!(second["event"]["type"], "TEXT_MESSAGE_END");

        std::fs::remove_file(&path).unwrap();
    }
}
