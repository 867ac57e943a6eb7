//! Model response types.
//!
//! A chat-completion response is a list of content blocks mixing text and
//! tool-use requests. The group-chat engine branches on
//! [`LlmResponse::has_tool_calls`] rather than on any text convention.

use crate::tool::entities::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single block of content within a model response.
///
/// ```
/// use orc_domain::session::response::ContentBlock;
///
/// let text = ContentBlock::Text("Searching the handbook.".to_string());
/// assert!(text.as_text().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(String),

    /// A tool call requested by the model.
    ToolUse {
        /// Model-assigned id used to correlate the result.
        id: String,
        name: String,
        input: HashMap<String, serde_json::Value>,
    },
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    /// Execute the requested tools and re-invoke the same agent.
    ToolUse,
    MaxTokens,
    /// The provider withheld the output.
    ContentFilter,
    Other(String),
}

/// A structured response from a model endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub model: Option<String>,
}

impl LlmResponse {
    /// Create a text-only response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(text.into())],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    /// Create a response that only requests tools.
    pub fn from_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            content: calls
                .into_iter()
                .map(|call| ContentBlock::ToolUse {
                    id: call.id,
                    name: call.tool_name,
                    input: call.arguments,
                })
                .collect(),
            stop_reason: Some(StopReason::ToolUse),
            model: None,
        }
    }

    pub fn with_stop_reason(mut self, reason: StopReason) -> Self {
        self.stop_reason = Some(reason);
        self
    }

    /// Concatenate all `Text` content blocks into a single string.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract all `ToolUse` content blocks as `Vec<ToolCall>`.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(ToolCall::new(id, name).with_arguments(input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    pub fn was_filtered(&self) -> bool {
        self.stop_reason == Some(StopReason::ContentFilter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_creates_text_only_response() {
        let response = LlmResponse::from_text("Done. TERMINATE");
        assert_eq!(response.text_content(), "Done. TERMINATE");
        assert!(!response.has_tool_calls());
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    }

    #[test]
    fn tool_calls_keep_ids_and_arguments() {
        let response = LlmResponse {
            content: vec![
                ContentBlock::Text("Looking that up.".to_string()),
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "vector_index_retrieve".to_string(),
                    input: [("input".to_string(), serde_json::json!("pto policy"))]
                        .into_iter()
                        .collect(),
                },
            ],
            stop_reason: Some(StopReason::ToolUse),
            model: Some("gpt-4o".to_string()),
        };

        let calls = response.tool_calls();
        assert!(response.has_tool_calls());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].get_string("input"), Some("pto policy"));
    }

    #[test]
    fn from_tool_calls_round_trips_through_blocks() {
        let call = ToolCall::new("call_9", "get_time");
        let response = LlmResponse::from_tool_calls(vec![call.clone()]);
        assert_eq!(response.tool_calls(), vec![call]);
        assert_eq!(response.text_content(), "");
    }

    #[test]
    fn content_filter_flag() {
        let response = LlmResponse::from_text("").with_stop_reason(StopReason::ContentFilter);
        assert!(response.was_filtered());
    }
}
