//! Tool Executor port
//!
//! Defines the interface for dispatching agent tool calls.

use async_trait::async_trait;
use orc_domain::{ToolCall, ToolContext, ToolDefinition, ToolResult, ToolSpec};

/// Port for tool execution
///
/// This port defines how the application layer executes tools.
/// Implementations (adapters) live in the infrastructure layer.
///
/// `execute` never fails: unknown tools, bad arguments, handler errors and
/// handler panics all come back as a failed [`ToolResult`].
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Get the specification of all available tools
    fn tool_spec(&self) -> &ToolSpec;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.tool_spec().contains(name)
    }

    /// Get the definition of a specific tool
    fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tool_spec().get(name)
    }

    /// Get names of all available tools
    fn available_tools(&self) -> Vec<&str> {
        self.tool_spec().names().collect()
    }

    /// Execute a tool call on behalf of the caller in `context`
    async fn execute(&self, call: &ToolCall, context: &ToolContext) -> ToolResult;
}
