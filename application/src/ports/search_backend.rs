//! Search backend port
//!
//! Hybrid vector/keyword retrieval used by the retrieval tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search backend not configured")]
    NotConfigured,

    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid search response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    /// Index name; the backend's default index when `None`
    pub index: Option<String>,
    pub top_k: usize,
    /// Security ids (`"anonymous"` or `"<id>,<groups>"`) restricting
    /// results; empty for indexes without access control
    pub security_ids: String,
    /// Extra backend filter expression
    pub filter: Option<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, security_ids: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            index: None,
            top_k: 3,
            security_ids: security_ids.into(),
            filter: None,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// One retrieved document chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub filepath: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub image_captions: Option<String>,
    /// Remaining backend fields (used by example-query retrieval)
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SearchHit {
    pub fn new(filepath: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(Value::as_str)
    }
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError>;
}

/// Backend used when no search endpoint is configured.
pub struct NoSearchBackend;

#[async_trait]
impl SearchBackend for NoSearchBackend {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        Err(SearchError::NotConfigured)
    }
}
