//! JSONL file writer for consultation events.
//!
//! Each [`ConversationEvent`] is serialized as a single JSON line with
//! `type`, `seq` and `timestamp` fields, appended via a buffered writer.

use ckm_application::{ConversationEvent, ConversationLogger};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

struct Sink {
    writer: BufWriter<File>,
    seq: u64,
}

/// JSONL transcript logger that writes one JSON object per line.
///
/// Thread-safe via a `Mutex` around the writer. Flushes after every record
/// and on `Drop`.
pub struct JsonlConversationLogger {
    sink: Mutex<Sink>,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Create a new logger writing to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create transcript directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create transcript file {}: {}", path.display(), e);
                return None;
            }
        };

        debug!("Writing consultation transcript to {}", path.display());
        Some(Self {
            sink: Mutex::new(Sink {
                writer: BufWriter::new(file),
                seq: 0,
            }),
            path: path.to_path_buf(),
        })
    }

    /// Create a timestamped transcript file inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Option<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let name = format!("consult-{}.conversation.jsonl", stamp);
        Self::new(dir.as_ref().join(name))
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn record(event: ConversationEvent, seq: u64) -> Value {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let mut map = match event.payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    map.insert("type".to_string(), Value::String(event.event_type.to_string()));
    map.insert("seq".to_string(), Value::from(seq));
    map.insert("timestamp".to_string(), Value::String(timestamp));
    Value::Object(map)
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(mut sink) = self.sink.lock() else {
            return;
        };
        sink.seq += 1;
        let Ok(line) = serde_json::to_string(&record(event, sink.seq)) else {
            return;
        };
        let _ = writeln!(sink.writer, "{}", line);
        let _ = sink.writer.flush();
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_record_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.conversation.jsonl");
        let logger = JsonlConversationLogger::new(&path).unwrap();

        logger.log(ConversationEvent::new(
            "intake_turn",
            json!({"state": "AwaitingConfirm", "fields": ["egfr"]}),
        ));
        logger.log(ConversationEvent::new(
            "assessment_result",
            json!({"role": "nephrology", "status": "timed_out", "elapsed_ms": 120000}),
        ));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.get("timestamp").is_some()));

        assert_eq!(lines[0]["type"], "intake_turn");
        assert_eq!(lines[0]["seq"], 1);
        assert_eq!(lines[0]["fields"][0], "egfr");
        assert_eq!(lines[1]["type"], "assessment_result");
        assert_eq!(lines[1]["seq"], 2);
        assert_eq!(lines[1]["status"], "timed_out");
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reset.conversation.jsonl");
        let logger = JsonlConversationLogger::new(&path).unwrap();

        logger.log(ConversationEvent::new("session_reset", json!("user request")));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "session_reset");
        assert_eq!(lines[0]["data"], "user request");
    }

    #[test]
    fn test_in_dir_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("ckm");
        let logger = JsonlConversationLogger::in_dir(&nested).unwrap();
        assert!(logger.path().starts_with(&nested));
        assert!(
            logger
                .path()
                .to_string_lossy()
                .ends_with(".conversation.jsonl")
        );
    }

    #[test]
    fn test_unwritable_path_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // A regular file cannot act as a parent directory
        assert!(JsonlConversationLogger::new(blocker.join("log.jsonl")).is_none());
    }
}
