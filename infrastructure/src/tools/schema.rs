//! JSON Schema tool converter.
//!
//! Default implementation of [`ToolSchemaPort`] producing the function-tool
//! declarations of the OpenAI chat-completions API.

use orc_application::ToolSchemaPort;
use orc_domain::{ToolDefinition, ToolSpec};
use serde_json::{Map, Value, json};

/// Produces `{"type":"function","function":{name, description, parameters}}`.
///
/// Handles param_type → JSON Schema type mapping:
/// - `"string"` → `"string"`
/// - `"number"` → `"number"`
/// - `"integer"` → `"integer"`
/// - `"boolean"` → `"boolean"`
/// - anything else → `"string"`
pub struct JsonSchemaToolConverter;

impl ToolSchemaPort for JsonSchemaToolConverter {
    fn tool_to_schema(&self, tool: &ToolDefinition) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &tool.parameters {
            let schema_type = match param.param_type.as_str() {
                "number" => "number",
                "integer" => "integer",
                "boolean" => "boolean",
                _ => "string",
            };
            properties.insert(
                param.name.clone(),
                json!({ "type": schema_type, "description": param.description }),
            );
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }

    fn all_tools_schema(&self, spec: &ToolSpec) -> Vec<Value> {
        let mut tools: Vec<&ToolDefinition> = spec.all().collect();
        tools.sort_by_key(|t| &t.name);
        tools.into_iter().map(|t| self.tool_to_schema(t)).collect()
    }
}
