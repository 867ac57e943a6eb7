//! Tool domain entities

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a tool is allowed to do to the outside world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSafety {
    /// Pure lookups (dates, data dictionary, search)
    ReadOnly,
    /// Runs caller-supplied statements against a data source; the handler
    /// must reject anything that is not a read-only query
    QueryExecution,
}

impl ToolSafety {
    pub fn as_str(&self) -> &str {
        match self {
            ToolSafety::ReadOnly => "read_only",
            ToolSafety::QueryExecution => "query_execution",
        }
    }

    pub fn executes_statements(&self) -> bool {
        matches!(self, ToolSafety::QueryExecution)
    }
}

impl std::fmt::Display for ToolSafety {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Definition of a tool that an agent can call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "vector_index_retrieve")
    pub name: String,
    /// Description shown to the model
    pub description: String,
    pub safety: ToolSafety,
    /// Parameter specifications
    pub parameters: Vec<ToolParameter>,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// Type hint (e.g., "string", "integer", "boolean")
    pub param_type: String,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, safety: ToolSafety) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            safety,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }
}

/// The set of tools known to a registry
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Restrict to the named tools, in the given order. Unknown names are skipped.
    pub fn subset<'a>(&'a self, names: &'a [String]) -> impl Iterator<Item = &'a ToolDefinition> {
        names.iter().filter_map(|name| self.tools.get(name))
    }
}

/// A call to a tool requested by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Model-assigned id, echoed back with the result
    pub id: String,
    pub tool_name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_arguments(mut self, arguments: HashMap<String, serde_json::Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required, non-blank string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        match self.get_string(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(format!("Missing required argument: {}", key)),
        }
    }

    /// Get an optional i64 argument
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.arguments.get(key).and_then(|v| v.as_i64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_flags() {
        assert!(!ToolSafety::ReadOnly.executes_statements());
        assert!(ToolSafety::QueryExecution.executes_statements());
        assert_eq!(ToolSafety::QueryExecution.to_string(), "query_execution");
    }

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new("execute_sql_query", "Run a query", ToolSafety::QueryExecution)
            .with_parameter(ToolParameter::new("datasource", "Target datasource", true))
            .with_parameter(ToolParameter::new("query", "SELECT statement", true))
            .with_parameter(ToolParameter::new("limit", "Row cap", false).with_type("integer"));

        assert_eq!(tool.parameters.len(), 3);
        assert_eq!(tool.required_parameters().count(), 2);
    }

    #[test]
    fn test_subset_keeps_requested_order_and_skips_unknown() {
        let spec = ToolSpec::new()
            .register(ToolDefinition::new("get_time", "Time", ToolSafety::ReadOnly))
            .register(ToolDefinition::new("get_today_date", "Date", ToolSafety::ReadOnly));

        let wanted = vec![
            "get_today_date".to_string(),
            "missing".to_string(),
            "get_time".to_string(),
        ];
        let names: Vec<&str> = spec.subset(&wanted).map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_today_date", "get_time"]);
    }

    #[test]
    fn test_tool_call_arguments() {
        let call = ToolCall::new("call_1", "vector_index_retrieve")
            .with_arg("input", "vacation policy")
            .with_arg("blank", "  ");

        assert_eq!(call.get_string("input"), Some("vacation policy"));
        assert_eq!(call.require_string("input").unwrap(), "vacation policy");
        assert!(call.require_string("blank").is_err());
        assert!(call.require_string("missing").is_err());
    }
}
