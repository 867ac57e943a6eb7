//! HTTP search backend (Azure AI Search REST shape).
//!
//! `POST {endpoint}/indexes/{index}/docs/search?api-version=...` with an
//! `api-key` header. Results are restricted to documents whose
//! `metadata_security_id` intersects the caller's security ids, or that
//! carry no security ids at all.

use std::time::Duration;

use async_trait::async_trait;
use orc_application::{SearchBackend, SearchError, SearchHit, SearchQuery};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::FileSearchConfig;

const SELECT: &str = "title, content, url, filepath, chunk_id, imageCaptions, relatedImages, \
question, query, selected_tables, selected_columns, reasoning";

pub struct HttpSearchBackend {
    client: Client,
    endpoint: String,
    api_version: String,
    index: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

impl HttpSearchBackend {
    /// `None` when no endpoint is configured.
    pub fn from_config(config: &FileSearchConfig) -> Result<Option<Self>, SearchError> {
        let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };

        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| SearchError::RequestFailed(format!("invalid api key header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static("api-key"), value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        Ok(Some(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            index: config.index.clone(),
        }))
    }

    fn url(&self, index: &str) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, index, self.api_version
        )
    }
}

/// Security clause combined with the query's own filter.
pub(crate) fn filter_expression(query: &SearchQuery) -> Option<String> {
    let security = (!query.security_ids.is_empty()).then(|| {
        format!(
            "(metadata_security_id/any(g:search.in(g, '{}')) or not metadata_security_id/any())",
            query.security_ids.replace('\'', "''")
        )
    });
    match (security, query.filter.as_deref()) {
        (Some(security), Some(extra)) => Some(format!("{} and ({})", security, extra)),
        (Some(security), None) => Some(security),
        (None, Some(extra)) => Some(extra.to_string()),
        (None, None) => None,
    }
}

fn into_hit(mut doc: Map<String, Value>) -> SearchHit {
    let mut take_string = |key: &str| match doc.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };
    let url = take_string("url");
    let filepath = take_string("filepath");
    let content = take_string("content").unwrap_or_default();
    let image_captions = take_string("imageCaptions");
    let image_urls = match doc.remove("relatedImages") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    doc.retain(|key, _| !key.starts_with('@'));

    SearchHit {
        filepath: url.filter(|u| !u.is_empty()).or(filepath).unwrap_or_default(),
        content,
        image_urls,
        image_captions,
        extra: doc,
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let index = query.index.as_deref().unwrap_or(&self.index);
        let mut body = json!({
            "search": query.text,
            "top": query.top_k,
            "select": SELECT,
        });
        if let Some(filter) = filter_expression(query) {
            body["filter"] = Value::String(filter);
        }

        let response = self
            .client
            .post(self.url(index))
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(index, status = status.as_u16(), "Search request failed");
            return Err(SearchError::RequestFailed(format!(
                "Status code: {}. Error: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;
        debug!(index, hits = parsed.value.len(), "Search completed");
        Ok(parsed.value.into_iter().map(into_hit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::{body_of, http, serve};

    fn backend(endpoint: &str) -> HttpSearchBackend {
        let config = FileSearchConfig {
            endpoint: Some(endpoint.to_string()),
            api_key: Some("search-key".to_string()),
            ..Default::default()
        };
        HttpSearchBackend::from_config(&config).unwrap().unwrap()
    }

    #[test]
    fn test_unconfigured() {
        assert!(HttpSearchBackend::from_config(&FileSearchConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_filter_expression() {
        let query = SearchQuery::new("q", "u-1,hr");
        assert_eq!(
            filter_expression(&query).unwrap(),
            "(metadata_security_id/any(g:search.in(g, 'u-1,hr')) or not metadata_security_id/any())"
        );

        let scoped = SearchQuery::new("q", "").with_filter("datasource eq 'sales'");
        assert_eq!(filter_expression(&scoped).unwrap(), "datasource eq 'sales'");

        let both = SearchQuery::new("q", "anonymous").with_filter("x eq 1");
        assert!(filter_expression(&both).unwrap().ends_with(" and (x eq 1)"));

        assert!(filter_expression(&SearchQuery::new("q", "")).is_none());
    }

    #[tokio::test]
    async fn test_search_maps_documents() {
        let body = r#"{"value":[{
            "@search.score": 1.5,
            "url": "https://acct.blob.core.windows.net/docs/a.pdf",
            "filepath": "a.pdf",
            "content": "Alpha",
            "relatedImages": ["https://img/1.png"],
            "imageCaptions": "[1.png]: one",
            "title": "A"
        }]}"#;
        let (url, requests) = serve(vec![http("200 OK", "application/json", body)]).await;

        let hits = backend(&url)
            .search(&SearchQuery::new("alpha", "anonymous").with_top_k(2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filepath, "https://acct.blob.core.windows.net/docs/a.pdf");
        assert_eq!(hits[0].image_urls, vec!["https://img/1.png".to_string()]);
        assert_eq!(hits[0].image_captions.as_deref(), Some("[1.png]: one"));
        assert_eq!(hits[0].field("title"), Some("A"));
        assert!(hits[0].extra.get("@search.score").is_none());

        let request = requests.lock().unwrap()[0].clone();
        assert!(request.starts_with("POST /indexes/ragindex/docs/search?api-version=2024-07-01"));
        assert!(request.to_ascii_lowercase().contains("api-key: search-key"));
        let sent: Value = serde_json::from_str(body_of(&request)).unwrap();
        assert_eq!(sent["top"], 2);
        assert_eq!(sent["search"], "alpha");
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let (url, _) = serve(vec![http("403 Forbidden", "text/plain", "denied")]).await;
        let err = backend(&url)
            .search(&SearchQuery::new("q", "anonymous").with_index("queries"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::RequestFailed(ref m) if m.contains("403") && m.contains("denied")));
    }
}
