//! Data-dictionary tools
//!
//! Datasource and table descriptions are loaded once at startup from a JSON
//! document:
//!
//! ```json
//! {
//!   "datasources": [{"id": "sales", "type": "sql_database", "description": "..."}],
//!   "tables": [{
//!     "datasource": "sales",
//!     "table": "orders",
//!     "description": "...",
//!     "columns": {"order_id": "Primary key"}
//!   }]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use orc_domain::tool::names::{GET_ALL_DATASOURCES_INFO, GET_ALL_TABLES_INFO, GET_SCHEMA_INFO};
use orc_domain::{
    ToolCall, ToolContext, ToolDefinition, ToolError, ToolHandler, ToolParameter, ToolSafety,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Failed to read data dictionary {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data dictionary: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceEntry {
    pub id: String,
    /// Free-form descriptive fields, passed through to the model
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub datasource: String,
    pub table: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataDictionary {
    #[serde(default)]
    pub datasources: Vec<DatasourceEntry>,
    #[serde(default)]
    pub tables: Vec<TableEntry>,
}

impl DataDictionary {
    pub fn from_json(text: &str) -> Result<Self, DictionaryError> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn load(path: &Path) -> Result<Self, DictionaryError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DictionaryError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&text)
    }

    pub fn tables_of<'a>(&'a self, datasource: &'a str) -> impl Iterator<Item = &'a TableEntry> {
        self.tables.iter().filter(move |t| t.datasource == datasource)
    }

    pub fn has_datasource(&self, datasource: &str) -> bool {
        self.datasources.iter().any(|d| d.id == datasource) || self.tables_of(datasource).next().is_some()
    }
}

fn datasource_parameter() -> ToolParameter {
    ToolParameter::new("datasource", "Name of the target datasource", true)
}

fn to_text(value: Value) -> Result<String, ToolError> {
    serde_json::to_string_pretty(&value).map_err(|e| ToolError::execution_failed(e.to_string()))
}

// ==================== get_all_datasources_info ====================

pub struct DatasourcesInfoTool {
    dictionary: Arc<DataDictionary>,
}

impl DatasourcesInfoTool {
    pub fn new(dictionary: Arc<DataDictionary>) -> Self {
        Self { dictionary }
    }
}

#[async_trait]
impl ToolHandler for DatasourcesInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            GET_ALL_DATASOURCES_INFO,
            "Lists every available datasource with its description.",
            ToolSafety::ReadOnly,
        )
    }

    async fn invoke(&self, _call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        to_text(json!({ "datasources": self.dictionary.datasources }))
    }
}

// ==================== get_all_tables_info ====================

pub struct TablesInfoTool {
    dictionary: Arc<DataDictionary>,
}

impl TablesInfoTool {
    pub fn new(dictionary: Arc<DataDictionary>) -> Self {
        Self { dictionary }
    }
}

#[async_trait]
impl ToolHandler for TablesInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            GET_ALL_TABLES_INFO,
            "Lists the tables of a datasource with their descriptions.",
            ToolSafety::ReadOnly,
        )
        .with_parameter(datasource_parameter())
    }

    async fn invoke(&self, call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        let datasource = call.require_string("datasource").map_err(ToolError::invalid_argument)?;
        let tables: Vec<Value> = self
            .dictionary
            .tables_of(datasource)
            .map(|t| json!({ "table": t.table, "description": t.description, "datasource": t.datasource }))
            .collect();
        if tables.is_empty() {
            return Err(ToolError::new(
                ToolError::NOT_FOUND,
                format!("No datasource with name '{}' was found.", datasource),
            ));
        }
        to_text(json!({ "tables": tables }))
    }
}

// ==================== get_schema_info ====================

/// Columns of one table, or of every table when no table is named.
pub struct SchemaInfoTool {
    dictionary: Arc<DataDictionary>,
}

impl SchemaInfoTool {
    pub fn new(dictionary: Arc<DataDictionary>) -> Self {
        Self { dictionary }
    }
}

fn schema_of(table: &TableEntry, column: Option<&str>) -> Result<Value, ToolError> {
    let columns: BTreeMap<&String, &String> = match column {
        Some(name) => {
            let found: BTreeMap<_, _> = table.columns.iter().filter(|(c, _)| c.as_str() == name).collect();
            if found.is_empty() {
                return Err(ToolError::new(
                    ToolError::NOT_FOUND,
                    format!("Column '{}' not found in table '{}'.", name, table.table),
                ));
            }
            found
        }
        None => table.columns.iter().collect(),
    };
    Ok(json!({
        "datasource": table.datasource,
        "table": table.table,
        "description": table.description,
        "columns": columns,
    }))
}

#[async_trait]
impl ToolHandler for SchemaInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            GET_SCHEMA_INFO,
            "Returns the description and columns of a table in a datasource.",
            ToolSafety::ReadOnly,
        )
        .with_parameter(datasource_parameter())
        .with_parameter(ToolParameter::new("table_name", "Target table", false))
        .with_parameter(ToolParameter::new("column_name", "Restrict to one column", false))
    }

    async fn invoke(&self, call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        let datasource = call.require_string("datasource").map_err(ToolError::invalid_argument)?;
        let table_name = call.get_string("table_name").filter(|t| !t.trim().is_empty());
        let column_name = call.get_string("column_name").filter(|c| !c.trim().is_empty());

        let tables: Vec<&TableEntry> = self.dictionary.tables_of(datasource).collect();
        if tables.is_empty() {
            return Err(ToolError::new(
                ToolError::NOT_FOUND,
                format!("Datasource '{}' not found in data dictionary.", datasource),
            ));
        }

        match table_name {
            Some(name) => {
                let table = tables.iter().find(|t| t.table == name).ok_or_else(|| {
                    ToolError::new(
                        ToolError::NOT_FOUND,
                        format!("Table '{}' not found in datasource '{}'.", name, datasource),
                    )
                })?;
                to_text(schema_of(table, column_name)?)
            }
            None => {
                let schemas = tables
                    .iter()
                    .map(|t| schema_of(t, None))
                    .collect::<Result<Vec<_>, _>>()?;
                to_text(json!({ "tables": schemas }))
            }
        }
    }
}
