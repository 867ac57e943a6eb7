//! Streaming events from a model endpoint.
//!
//! Adapters translate their wire format into this closed set so callers
//! never scrape provider-specific text.

use super::response::LlmResponse;

/// An event in a streaming model response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text fragment, in production order.
    Delta(String),
    /// The assembled response (text and tool calls). Terminal.
    Completed(LlmResponse),
    /// The stream failed. Terminal.
    Error(String),
}

impl StreamEvent {
    /// Returns the text fragment if this is a Delta event.
    pub fn delta(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }
}
