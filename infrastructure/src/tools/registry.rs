//! Tool Registry
//!
//! The [`ToolRegistry`] owns one [`ToolHandler`] per tool name and
//! implements [`ToolExecutorPort`]. It is the dispatch boundary: argument
//! checks, unknown names, handler errors and handler panics all end up as a
//! failed [`ToolResult`] instead of escaping into the engine.
//!
//! # Usage
//!
//! ```ignore
//! use orc_infrastructure::tools::{ToolRegistry, TodayDateTool, TimeTool};
//!
//! let registry = ToolRegistry::new()
//!     .register(TodayDateTool)
//!     .register(TimeTool);
//!
//! assert!(registry.has_tool("get_today_date"));
//!
//! let call = ToolCall::new("call_1", "get_time");
//! let result = registry.execute(&call, &ToolContext::default()).await;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use orc_application::ToolExecutorPort;
use orc_domain::{ToolCall, ToolContext, ToolDefinition, ToolError, ToolHandler, ToolResult, ToolSpec};
use tracing::{debug, error, warn};

/// Name → handler map with a merged [`ToolSpec`].
///
/// Registering a second handler under an existing name replaces the first.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    tool_spec: ToolSpec,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler
    pub fn register<H: ToolHandler + 'static>(self, handler: H) -> Self {
        self.register_arc(Arc::new(handler))
    }

    /// Register a tool handler (Arc version)
    pub fn register_arc(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        let definition = handler.definition();
        if self.handlers.contains_key(&definition.name) {
            warn!(tool = %definition.name, "Replacing registered tool");
        }
        debug!(tool = %definition.name, safety = %definition.safety, "Registered tool");
        self.handlers.insert(definition.name.clone(), handler);
        self.tool_spec = std::mem::take(&mut self.tool_spec).register(definition);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Required parameters must be present, non-null and, for strings, non-blank.
fn check_arguments(definition: &ToolDefinition, call: &ToolCall) -> Result<(), ToolError> {
    for param in definition.required_parameters() {
        let present = match call.arguments.get(&param.name) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(ToolError::invalid_argument(format!(
                "Missing required argument: {}",
                param.name
            )));
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[async_trait]
impl ToolExecutorPort for ToolRegistry {
    fn tool_spec(&self) -> &ToolSpec {
        &self.tool_spec
    }

    async fn execute(&self, call: &ToolCall, context: &ToolContext) -> ToolResult {
        let Some(handler) = self.handlers.get(&call.tool_name) else {
            warn!(tool = %call.tool_name, call_id = %call.id, "Unknown tool requested");
            return ToolResult::failure(
                &call.tool_name,
                ToolError::new(
                    ToolError::NOT_FOUND,
                    format!("Tool not found: {}", call.tool_name),
                ),
            );
        };

        if let Some(definition) = self.tool_spec.get(&call.tool_name)
            && let Err(e) = check_arguments(definition, call)
        {
            debug!(tool = %call.tool_name, error = %e, "Rejected tool arguments");
            return ToolResult::failure(&call.tool_name, e);
        }

        let started = Instant::now();
        let outcome = AssertUnwindSafe(handler.invoke(call, context))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(output)) => ToolResult::success(&call.tool_name, output),
            Ok(Err(e)) => {
                warn!(tool = %call.tool_name, call_id = %call.id, error = %e, "Tool failed");
                ToolResult::failure(&call.tool_name, e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(tool = %call.tool_name, call_id = %call.id, panic = %message, "Tool panicked");
                ToolResult::failure(
                    &call.tool_name,
                    ToolError::execution_failed(format!("Tool '{}' panicked", call.tool_name))
                        .with_details(message),
                )
            }
        };
        debug!(
            tool = %call.tool_name,
            call_id = %call.id,
            success = result.is_success(),
            duration_ms = elapsed,
            "Tool dispatched"
        );
        result.with_duration(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_domain::{ToolParameter, ToolSafety};

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo the input", ToolSafety::ReadOnly)
                .with_parameter(ToolParameter::new("input", "Text", true))
        }

        async fn invoke(&self, call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
            Ok(call.get_string("input").unwrap_or_default().to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl ToolHandler for Broken {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("broken", "Always panics", ToolSafety::ReadOnly)
        }

        async fn invoke(&self, _call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
            panic!("index out of range");
        }
    }

    struct Refuses;

    #[async_trait]
    impl ToolHandler for Refuses {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("refuses", "Always errors", ToolSafety::QueryExecution)
        }

        async fn invoke(&self, _call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
            Err(ToolError::permission_denied("Only SELECT statements are allowed."))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new().register(Echo).register(Broken).register(Refuses)
    }

    #[tokio::test]
    async fn test_registry_execute() {
        let call = ToolCall::new("c1", "echo").with_arg("input", "hello");
        let result = registry().execute(&call, &ToolContext::default()).await;

        assert!(result.is_success());
        assert_eq!(result.output(), Some("hello"));
        assert!(result.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let call = ToolCall::new("c1", "unknown_tool");
        let result = registry().execute(&call, &ToolContext::default()).await;

        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, ToolError::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_registry_missing_required_argument() {
        let call = ToolCall::new("c1", "echo").with_arg("input", "   ");
        let result = registry().execute(&call, &ToolContext::default()).await;

        let error = result.error().unwrap();
        assert_eq!(error.code, ToolError::INVALID_ARGUMENT);
        assert!(error.message.contains("input"));
    }

    #[tokio::test]
    async fn test_registry_catches_panics() {
        let call = ToolCall::new("c1", "broken");
        let result = registry().execute(&call, &ToolContext::default()).await;

        let error = result.error().unwrap();
        assert_eq!(error.code, ToolError::EXECUTION_FAILED);
        assert_eq!(error.details.as_deref(), Some("index out of range"));
    }

    #[tokio::test]
    async fn test_registry_passes_handler_errors_through() {
        let call = ToolCall::new("c1", "refuses");
        let result = registry().execute(&call, &ToolContext::default()).await;
        assert_eq!(result.error().unwrap().code, ToolError::PERMISSION_DENIED);
    }

    #[test]
    fn test_registry_spec() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.has_tool("echo"));
        assert_eq!(
            registry.get_tool("refuses").unwrap().safety,
            ToolSafety::QueryExecution
        );
    }
}
