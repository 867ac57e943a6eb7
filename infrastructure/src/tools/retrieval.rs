//! Knowledge-base retrieval tools backed by a [`SearchBackend`].
//!
//! Text results are rendered as `"<path>: <content>"` so cited sources can
//! be recovered from the transcript later.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use orc_application::{SearchBackend, SearchError, SearchHit, SearchQuery};
use orc_domain::tool::names::{
    MULTIMODAL_VECTOR_INDEX_RETRIEVE, QUERIES_RETRIEVAL, VECTOR_INDEX_RETRIEVE,
};
use orc_domain::{
    ToolCall, ToolContext, ToolDefinition, ToolError, ToolHandler, ToolParameter, ToolSafety,
};
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

static BLOB_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://[^/]+\.blob\.core\.windows\.net").expect("blob host pattern is valid")
});

static CAPTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]:\s").expect("caption marker pattern is valid"));

const INPUT_DESCRIPTION: &str =
    "An optimized query string based on the user's ask and conversation history, when available";

/// Storage-relative path of a hit: the blob host is dropped from URLs.
fn source_path(hit: &SearchHit) -> String {
    BLOB_HOST.replace(&hit.filepath, "").into_owned()
}

/// Captions come as `"[image1.png]: a chart [image2.png]: a table"`.
pub(crate) fn extract_captions(captions: &str) -> Vec<String> {
    let markers: Vec<_> = CAPTION_MARKER.find_iter(captions).collect();
    markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = markers.get(i + 1).map_or(captions.len(), |next| next.start());
            captions[m.end()..end].trim().to_string()
        })
        .collect()
}

fn search_failed(error: SearchError) -> ToolError {
    match error {
        SearchError::NotConfigured => {
            ToolError::execution_failed("Search backend is not configured.")
        }
        other => ToolError::execution_failed(other.to_string()),
    }
}

fn input_parameter() -> ToolParameter {
    ToolParameter::new("input", INPUT_DESCRIPTION, true)
}

// ==================== vector_index_retrieve ====================

/// Hybrid search over the document index, filtered by the caller's security ids.
pub struct VectorIndexRetrieveTool {
    backend: Arc<dyn SearchBackend>,
    top_k: usize,
}

impl VectorIndexRetrieveTool {
    pub fn new(backend: Arc<dyn SearchBackend>, top_k: usize) -> Self {
        Self { backend, top_k }
    }
}

#[async_trait]
impl ToolHandler for VectorIndexRetrieveTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            VECTOR_INDEX_RETRIEVE,
            "Searches the knowledge base and returns matching document excerpts with their source paths.",
            ToolSafety::ReadOnly,
        )
        .with_parameter(input_parameter())
    }

    async fn invoke(&self, call: &ToolCall, context: &ToolContext) -> Result<String, ToolError> {
        let input = call.require_string("input").map_err(ToolError::invalid_argument)?;
        let query = SearchQuery::new(input, context.credentials.security_ids()).with_top_k(self.top_k);
        let hits = self.backend.search(&query).await.map_err(search_failed)?;
        debug!(tool = VECTOR_INDEX_RETRIEVE, hits = hits.len(), "Documents retrieved");

        Ok(hits
            .iter()
            .map(|hit| format!("{}: {}\n", source_path(hit), hit.content.trim()))
            .collect::<Vec<_>>()
            .join(" "))
    }
}

// ==================== multimodal_vector_index_retrieve ====================

/// Like [`VectorIndexRetrieveTool`], also returning related images and
/// their captions as `{"texts":[..],"images":[[..]],"captions":[[..]]}`.
pub struct MultimodalRetrieveTool {
    backend: Arc<dyn SearchBackend>,
    top_k: usize,
}

impl MultimodalRetrieveTool {
    pub fn new(backend: Arc<dyn SearchBackend>, top_k: usize) -> Self {
        Self { backend, top_k }
    }
}

#[async_trait]
impl ToolHandler for MultimodalRetrieveTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            MULTIMODAL_VECTOR_INDEX_RETRIEVE,
            "Searches the knowledge base and returns text excerpts plus related image URLs and captions.",
            ToolSafety::ReadOnly,
        )
        .with_parameter(input_parameter())
    }

    async fn invoke(&self, call: &ToolCall, context: &ToolContext) -> Result<String, ToolError> {
        let input = call.require_string("input").map_err(ToolError::invalid_argument)?;
        let query = SearchQuery::new(input, context.credentials.security_ids()).with_top_k(self.top_k);
        let hits = self.backend.search(&query).await.map_err(search_failed)?;
        debug!(tool = MULTIMODAL_VECTOR_INDEX_RETRIEVE, hits = hits.len(), "Documents retrieved");

        let texts: Vec<String> = hits
            .iter()
            .map(|hit| format!("{}: {}", source_path(hit), hit.content.trim()))
            .collect();
        let images: Vec<&Vec<String>> = hits.iter().map(|hit| &hit.image_urls).collect();
        let captions: Vec<Vec<String>> = hits
            .iter()
            .map(|hit| hit.image_captions.as_deref().map(extract_captions).unwrap_or_default())
            .collect();

        Ok(json!({ "texts": texts, "images": images, "captions": captions }).to_string())
    }
}

// ==================== queries_retrieval ====================

/// Few-shot example queries from a dedicated index, optionally scoped to
/// one datasource.
pub struct QueriesRetrievalTool {
    backend: Arc<dyn SearchBackend>,
    index: String,
    top_k: usize,
}

impl QueriesRetrievalTool {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        Self {
            backend,
            index: index.into(),
            top_k: 3,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

fn example_query(hit: &SearchHit) -> Value {
    let text = |name: &str| hit.field(name).unwrap_or_default().to_string();
    let list = |name: &str| hit.extra.get(name).cloned().unwrap_or_else(|| json!([]));
    json!({
        "question": text("question"),
        "query": text("query"),
        "selected_tables": list("selected_tables"),
        "selected_columns": list("selected_columns"),
        "reasoning": text("reasoning"),
    })
}

#[async_trait]
impl ToolHandler for QueriesRetrievalTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            QUERIES_RETRIEVAL,
            "Finds previously answered questions with their queries, selected tables, columns and reasoning.",
            ToolSafety::ReadOnly,
        )
        .with_parameter(input_parameter())
        .with_parameter(ToolParameter::new("datasource", "Datasource name", false))
    }

    async fn invoke(&self, call: &ToolCall, _context: &ToolContext) -> Result<String, ToolError> {
        let input = call.require_string("input").map_err(ToolError::invalid_argument)?;
        // Example queries are not access-controlled
        let mut query = SearchQuery::new(input, "")
            .with_index(self.index.as_str())
            .with_top_k(self.top_k);
        if let Some(datasource) = call.get_string("datasource").filter(|d| !d.trim().is_empty()) {
            query = query.with_filter(format!("datasource eq '{}'", datasource.replace('\'', "''")));
        }

        let hits = self.backend.search(&query).await.map_err(search_failed)?;
        let examples: Vec<Value> = hits.iter().map(example_query).collect();
        serde_json::to_string_pretty(&examples)
            .map_err(|e| ToolError::execution_failed(e.to_string()))
    }
}
