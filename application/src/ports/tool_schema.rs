//! Tool schema conversion port.
//!
//! Separates "which tools an agent may use" (domain) from "how to serialize
//! for the API" (infrastructure). The domain layer defines
//! [`ToolDefinition`] and [`ToolSpec`]; this port produces the JSON Schema
//! function declarations the model endpoint expects.

use orc_domain::{ToolDefinition, ToolSpec};

/// Port for converting tool definitions to LLM API format (JSON Schema).
pub trait ToolSchemaPort: Send + Sync {
    /// Convert a single tool definition to provider-neutral JSON Schema.
    fn tool_to_schema(&self, tool: &ToolDefinition) -> serde_json::Value;

    /// Convert all tools to JSON Schema array (sorted by name).
    fn all_tools_schema(&self, spec: &ToolSpec) -> Vec<serde_json::Value>;

    /// Convert the named subset to JSON Schema (sorted by name).
    ///
    /// Names missing from `spec` are skipped.
    fn tools_schema(&self, spec: &ToolSpec, names: &[String]) -> Vec<serde_json::Value> {
        let mut tools: Vec<_> = spec.subset(names).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools.into_iter().map(|t| self.tool_to_schema(t)).collect()
    }
}
