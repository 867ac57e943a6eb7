//! Query engine port
//!
//! Executes read-only statements against a named datasource.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Query engine not configured")]
    NotConfigured,

    #[error("Unknown datasource: {0}")]
    UnknownDatasource(String),

    #[error("Query failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLanguage {
    Sql,
    Dax,
}

impl QueryLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryLanguage::Sql => "sql",
            QueryLanguage::Dax => "dax",
        }
    }
}

/// Tabular query output; each row is a column-name → value object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRows {
    #[serde(default)]
    pub rows: Vec<serde_json::Map<String, Value>>,
}

impl QueryRows {
    pub fn new(rows: Vec<serde_json::Map<String, Value>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(
        &self,
        datasource: &str,
        language: QueryLanguage,
        statement: &str,
    ) -> Result<QueryRows, QueryError>;
}

/// Engine used when no query endpoint is configured.
pub struct NoQueryEngine;

#[async_trait]
impl QueryEngine for NoQueryEngine {
    async fn execute(
        &self,
        _datasource: &str,
        _language: QueryLanguage,
        _statement: &str,
    ) -> Result<QueryRows, QueryError> {
        Err(QueryError::NotConfigured)
    }
}
