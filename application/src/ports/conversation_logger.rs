//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording consultation events
//! (intake turns, role results, synthesis attempts, views) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the session
//! transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured conversation event for logging.
///
/// Each event has a type string and a JSON payload with event-specific
/// fields; the adapter adds the timestamp.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "intake_turn", "assessment_result", "view").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    /// Create a new conversation event.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging conversation events to a structured log.
///
/// Implementations write each event as a single record (e.g., one JSONL line).
/// `log` is synchronous and non-fallible; logging failures are ignored by
/// the caller.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}

/// In-memory logger for tests
#[cfg(test)]
#[derive(Default)]
pub struct RecordingLogger {
    pub events: std::sync::Mutex<Vec<(&'static str, Value)>>,
}

#[cfg(test)]
impl RecordingLogger {
    pub fn types(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[cfg(test)]
impl ConversationLogger for RecordingLogger {
    fn log(&self, event: ConversationEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.payload));
    }
}
