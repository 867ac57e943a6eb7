//! Tool domain value objects: immutable result and error types
//!
//! Every dispatch produces a [`ToolResult`]; failures are data, not
//! exceptions, so a misbehaving tool can never abort an agent exchange.

use serde::{Deserialize, Serialize};

/// Error that occurred during tool dispatch.
///
/// | Code | Meaning |
/// |------|---------|
/// | `NOT_FOUND` | Unknown tool, or the requested object does not exist |
/// | `INVALID_ARGUMENT` | Missing or malformed arguments |
/// | `PERMISSION_DENIED` | Statement rejected by the tool's safety policy |
/// | `EXECUTION_FAILED` | Backend error, or the handler panicked |
/// | `TIMEOUT` | Backend did not answer in time |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const PERMISSION_DENIED: &'static str = "PERMISSION_DENIED";
    pub const EXECUTION_FAILED: &'static str = "EXECUTION_FAILED";
    pub const TIMEOUT: &'static str = "TIMEOUT";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(Self::NOT_FOUND, format!("Not found: {}", resource.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_ARGUMENT, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(Self::PERMISSION_DENIED, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(Self::EXECUTION_FAILED, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(Self::TIMEOUT, format!("Operation timed out: {}", operation.into()))
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Self::NOT_FOUND
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            duration_ms: None,
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Text handed back to the model: the output, or the rendered error.
    pub fn model_content(&self) -> String {
        match (&self.output, &self.error) {
            (Some(output), _) if self.success => output.clone(),
            (_, Some(error)) => format!("Error: {}", error),
            _ => String::new(),
        }
    }
}
