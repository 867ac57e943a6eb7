//! Transcript messages

use crate::tool::ToolCall;
use serde::{Deserialize, Serialize};

/// Speaker name for the human asking the question.
pub const USER_SPEAKER: &str = "user";

/// Output of one tool call, correlated by call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub call_id: String,
    pub tool_name: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(call_id: impl Into<String>, tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::ok(call_id, tool_name, content)
        }
    }
}

/// What a message carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    ToolCallRequest(Vec<ToolCall>),
    ToolCallResult(Vec<ToolOutput>),
}

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// `"user"` or an agent name. Tool results carry the requesting agent.
    pub speaker: String,
    pub body: MessageBody,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(USER_SPEAKER, text)
    }

    pub fn text(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            body: MessageBody::Text(text.into()),
        }
    }

    pub fn tool_request(speaker: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            speaker: speaker.into(),
            body: MessageBody::ToolCallRequest(calls),
        }
    }

    pub fn tool_result(speaker: impl Into<String>, outputs: Vec<ToolOutput>) -> Self {
        Self {
            speaker: speaker.into(),
            body: MessageBody::ToolCallResult(outputs),
        }
    }

    pub fn is_from_user(&self) -> bool {
        self.speaker == USER_SPEAKER
    }

    /// Text or tool-call request authored by an agent.
    pub fn is_agent_message(&self) -> bool {
        !self.is_from_user() && !matches!(self.body, MessageBody::ToolCallResult(_))
    }

    pub fn is_tool_event(&self) -> bool {
        matches!(
            self.body,
            MessageBody::ToolCallRequest(_) | MessageBody::ToolCallResult(_)
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        match &self.body {
            MessageBody::Text(text) => format!("{}: {}", self.speaker, text),
            MessageBody::ToolCallRequest(calls) => {
                let names: Vec<String> = calls
                    .iter()
                    .map(|c| {
                        let args = serde_json::to_string(&c.arguments).unwrap_or_default();
                        format!("{}({})", c.tool_name, args)
                    })
                    .collect();
                format!("{} -> {}", self.speaker, names.join(", "))
            }
            MessageBody::ToolCallResult(outputs) => {
                let parts: Vec<String> = outputs
                    .iter()
                    .map(|o| format!("[{}] {}", o.tool_name, o.content))
                    .collect();
                format!("{} <- {}", self.speaker, parts.join(" | "))
            }
        }
    }
}
