//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording conversation events
//! (agent turns, tool calls, final answers) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! conversation transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured conversation event for logging.
///
/// Each event has a type string and a JSON payload; adapters add the
/// UTC timestamp when writing.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "agent_message", "tool_call", "answer").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Attach the conversation id to an object payload.
    pub fn for_conversation(mut self, conversation_id: &str) -> Self {
        if let Value::Object(map) = &mut self.payload {
            map.insert(
                "conversation_id".to_string(),
                Value::String(conversation_id.to_string()),
            );
        }
        self
    }
}

/// Port for logging conversation events to a structured log.
///
/// Implementations write each event as a single record (e.g., one JSONL line).
/// The `log` method is intentionally synchronous and non-fallible to avoid
/// disrupting the main execution flow; logging failures are silently ignored.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
