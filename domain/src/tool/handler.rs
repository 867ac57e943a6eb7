//! Tool handler abstraction
//!
//! A [`ToolHandler`] owns one tool: its [`ToolDefinition`] and the code that
//! runs it. Handlers receive the caller's [`Credentials`] through a
//! [`ToolContext`] instead of reading ambient request state, which keeps
//! every handler testable in isolation.
//!
//! Handlers report failure with a [`ToolError`]; the registry turns both
//! errors and panics into failed [`ToolResult`](super::ToolResult)s.

use async_trait::async_trait;

use super::entities::{ToolCall, ToolDefinition};
use super::value_objects::ToolError;
use crate::core::credentials::Credentials;

/// Per-call context passed to handlers
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub credentials: Credentials,
    pub conversation_id: Option<String>,
}

impl ToolContext {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            conversation_id: None,
        }
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}

/// One registered tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Static description of the tool, including its parameter schema
    fn definition(&self) -> ToolDefinition;

    /// Run the tool and return the text handed back to the model
    async fn invoke(&self, call: &ToolCall, context: &ToolContext) -> Result<String, ToolError>;
}
