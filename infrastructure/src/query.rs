//! HTTP query engine.
//!
//! Forwards checked statements to a query service:
//! `POST {endpoint}/query` with `{"datasource", "language", "statement"}`,
//! answered by `{"rows": [{column: value}, ..]}`. A 404 means the service
//! does not know the datasource.

use std::time::Duration;

use async_trait::async_trait;
use orc_application::{QueryEngine, QueryError, QueryLanguage, QueryRows};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::debug;

use crate::config::FileQueryConfig;

pub struct HttpQueryEngine {
    client: Client,
    endpoint: String,
}

impl HttpQueryEngine {
    /// `None` when no endpoint is configured.
    pub fn from_config(config: &FileQueryConfig) -> Result<Option<Self>, QueryError> {
        let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
            return Ok(None);
        };

        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| QueryError::Failed(format!("invalid api key header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static("api-key"), value);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| QueryError::Failed(e.to_string()))?;

        Ok(Some(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }))
    }
}

#[async_trait]
impl QueryEngine for HttpQueryEngine {
    async fn execute(
        &self,
        datasource: &str,
        language: QueryLanguage,
        statement: &str,
    ) -> Result<QueryRows, QueryError> {
        let response = self
            .client
            .post(format!("{}/query", self.endpoint))
            .json(&json!({
                "datasource": datasource,
                "language": language,
                "statement": statement,
            }))
            .send()
            .await
            .map_err(|e| QueryError::Failed(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(QueryError::UnknownDatasource(datasource.to_string())),
            status if !status.is_success() => {
                let text = response.text().await.unwrap_or_default();
                Err(QueryError::Failed(format!("HTTP {}: {}", status.as_u16(), text)))
            }
            _ => {
                let rows: QueryRows = response
                    .json()
                    .await
                    .map_err(|e| QueryError::Failed(format!("invalid response: {e}")))?;
                debug!(datasource, language = language.as_str(), rows = rows.len(), "Query answered");
                Ok(rows)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::{body_of, http, serve};
    use serde_json::Value;

    fn engine(endpoint: &str) -> HttpQueryEngine {
        let config = FileQueryConfig {
            endpoint: Some(endpoint.to_string()),
            api_key: None,
        };
        HttpQueryEngine::from_config(&config).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_rows_and_request_shape() {
        let (url, requests) = serve(vec![http(
            "200 OK",
            "application/json",
            r#"{"rows":[{"region":"EU","total":10}]}"#,
        )])
        .await;

        let rows = engine(&url)
            .execute("sales", QueryLanguage::Dax, "EVALUATE Sales")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.rows[0]["region"], "EU");

        let request = requests.lock().unwrap()[0].clone();
        assert!(request.starts_with("POST /query"));
        let sent: Value = serde_json::from_str(body_of(&request)).unwrap();
        assert_eq!(sent["language"], "dax");
        assert_eq!(sent["datasource"], "sales");
    }

    #[tokio::test]
    async fn test_unknown_datasource() {
        let (url, _) = serve(vec![http("404 Not Found", "text/plain", "")]).await;
        let err = engine(&url)
            .execute("nope", QueryLanguage::Sql, "SELECT 1")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownDatasource(ref d) if d == "nope"));
    }

    #[test]
    fn test_unconfigured() {
        assert!(HttpQueryEngine::from_config(&FileQueryConfig::default()).unwrap().is_none());
    }
}
