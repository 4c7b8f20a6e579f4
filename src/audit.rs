//! Structured JSONL audit log for record workflow activity.
//!
//! Machine-parseable, append-only logging with:
//! - Monotonic sequence numbers for ordering
//! - ISO 8601 timestamps with microsecond precision
//! - A stream ID correlating entries from one deployment
//! - Structured event data in JSON format

use chrono::Utc;
use cqrs_es::DomainEvent;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::state_machine::RecordEvent;

/// Append-only JSONL audit writer.
pub struct AuditLog {
    stream_id: String,
    seq: AtomicU64,
    log_file: Mutex<File>,
    log_path: PathBuf,
}

/// A single audit entry in JSONL format.
#[derive(Serialize, serde::Deserialize)]
pub struct AuditEntry {
    /// Monotonic sequence number (unique across the stream)
    pub seq: u64,
    /// ISO 8601 timestamp with microseconds
    pub ts: String,
    /// Stream ID correlating entries from one deployment
    pub stream_id: String,
    /// Component that emitted the entry
    pub component: String,
    /// Structured event data
    pub event: Value,
}

impl AuditLog {
    /// Creates an audit log writing to `<dir>/audit.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - The log file cannot be opened
    pub fn new(stream_id: &str, dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let log_path = dir.join("audit.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            stream_id: stream_id.to_string(),
            seq: AtomicU64::new(0),
            log_file: Mutex::new(file),
            log_path,
        })
    }

    /// Returns the next sequence number.
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Appends a structured entry as a single JSON line.
    ///
    /// Thread-safe; write failures are swallowed so auditing never takes
    /// the workflow down.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = AuditEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            stream_id: self.stream_id.clone(),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut file) = self.log_file.lock() {
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(file, "{}", line);
            }
        }
    }

    /// Logs a received workflow command.
    pub fn log_command(&self, apply_seq: u64, command_name: &str) {
        #[derive(Serialize)]
        struct CommandReceived<'a> {
            kind: &'a str,
            apply_seq: u64,
            command: &'a str,
        }
        self.log(
            "workflow",
            CommandReceived {
                kind: "command_received",
                apply_seq,
                command: command_name,
            },
        );
    }

    /// Logs an emitted record event, tagged with its event type.
    pub fn log_event(&self, apply_seq: u64, event: &RecordEvent) {
        #[derive(Serialize)]
        struct EventEmitted<'a> {
            kind: &'a str,
            apply_seq: u64,
            event_type: String,
            event_version: String,
            event: &'a RecordEvent,
        }
        self.log(
            "workflow",
            EventEmitted {
                kind: "event_emitted",
                apply_seq,
                event_type: event.event_type(),
                event_version: event.event_version(),
                event,
            },
        );
    }

    /// Path of the JSONL file.
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordState;
    use crate::types::{RecordId, TimestampUtc};
    use tempfile::TempDir;

    #[test]
    fn entries_parse_back_with_increasing_seq() {
        let dir = TempDir::new().expect("temp dir");
        let log = AuditLog::new("test-stream", dir.path()).expect("audit log");

        let record = RecordId::new();
        for i in 0..3 {
            log.log_event(
                i,
                &RecordEvent::StateChanged {
                    record,
                    from: RecordState::PendingValidate,
                    to: RecordState::InResolution,
                    changed_at: TimestampUtc::now(),
                },
            );
        }

        let contents = std::fs::read_to_string(log.path()).expect("read log");
        let mut last_seq = 0;
        let mut lines = 0;
        for line in contents.lines() {
            let entry: AuditEntry = serde_json::from_str(line).expect("parse entry");
            assert!(entry.seq > last_seq, "seq must strictly increase");
            assert_eq!(entry.stream_id, "test-stream");
            last_seq = entry.seq;
            lines += 1;
        }
        assert_eq!(lines, 3);
    }

    #[test]
    fn command_entries_carry_the_command_name() {
        let dir = TempDir::new().expect("temp dir");
        let log = AuditLog::new("test-stream", dir.path()).expect("audit log");
        log.log_command(1, "Advance");

        let contents = std::fs::read_to_string(log.path()).expect("read log");
        let entry: AuditEntry = serde_json::from_str(contents.trim()).expect("parse entry");
        assert_eq!(entry.component, "workflow");
        assert_eq!(entry.event["command"], "Advance");
    }
}
