//! OpenAI-compatible chat-completion gateway.
//!
//! Implements [`LlmGateway`] over HTTP. Throttling (429), server errors and
//! transport failures are retried with [`RetryPolicy`] before any output is
//! produced; once a streamed response has started it is never replayed.

use super::retry::{RetryPolicy, is_retryable_status, retry_after};
use super::wire::{ChatResponse, ErrorBody, SSE_DONE, StreamAccumulator, StreamChunk, request_body};
use crate::config::FileModelConfig;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use orc_application::{GatewayError, LlmGateway, ModelRequest, StreamHandle};
use orc_domain::{LlmResponse, StopReason, StreamEvent};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// How the endpoint expects to be addressed.
#[derive(Debug, Clone, PartialEq)]
enum Addressing {
    /// `<endpoint>/chat/completions`, model named in the body
    OpenAi,
    /// `<endpoint>/openai/deployments/<deployment>/chat/completions?api-version=`
    Azure { api_version: String },
}

enum Reply {
    Ok(reqwest::Response),
    /// The endpoint refused the prompt itself.
    Filtered,
}

#[derive(Clone)]
pub struct OpenAiGateway {
    client: Client,
    endpoint: String,
    addressing: Addressing,
    deployment: String,
    retry: RetryPolicy,
}

impl OpenAiGateway {
    pub fn from_config(config: &FileModelConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.resolve_api_key() {
            let (name, value) = match config.api_version {
                Some(_) => (header::HeaderName::from_static("api-key"), key),
                None => (header::AUTHORIZATION, format!("Bearer {key}")),
            };
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| GatewayError::Other(format!("invalid API key header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Other(format!("failed to build HTTP client: {e}")))?;

        let addressing = match &config.api_version {
            Some(api_version) => Addressing::Azure {
                api_version: api_version.clone(),
            },
            None => Addressing::OpenAi,
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            addressing,
            deployment: config.deployment.clone(),
            retry: RetryPolicy::default().with_max_retries(config.max_retries),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, deployment: &str) -> String {
        match &self.addressing {
            Addressing::OpenAi => format!("{}/chat/completions", self.endpoint),
            Addressing::Azure { api_version } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, deployment, api_version
            ),
        }
    }

    fn body(&self, request: &ModelRequest, stream: bool) -> (String, Value) {
        let deployment = request
            .params
            .deployment
            .clone()
            .unwrap_or_else(|| self.deployment.clone());
        let body = request_body(request, &deployment, stream);
        (self.url(&deployment), body)
    }

    /// POST with retries until a success status, a content-filter refusal,
    /// or a final error.
    async fn post(&self, url: &str, body: &Value) -> Result<Reply, GatewayError> {
        let mut attempt = 0;
        loop {
            let result = self.client.post(url).json(body).send().await;
            let (error, hint) = match result {
                Ok(response) if response.status().is_success() => return Ok(Reply::Ok(response)),
                Ok(response) => {
                    let status = response.status();
                    let hint = retry_after(response.headers());
                    let text = response.text().await.unwrap_or_default();
                    if status == StatusCode::BAD_REQUEST
                        && ErrorBody::parse(&text).is_some_and(|b| b.is_content_filter())
                    {
                        debug!("Prompt rejected by content filter");
                        return Ok(Reply::Filtered);
                    }
                    let error = status_error(status, &text);
                    if !is_retryable_status(status) {
                        return Err(error);
                    }
                    (error, hint)
                }
                Err(e) => {
                    let error = transport_error(&e);
                    if !error.is_retryable() {
                        return Err(error);
                    }
                    (error, None)
                }
            };

            let Some(delay) = self.retry.delay(attempt, hint) else {
                warn!(attempts = attempt + 1, error = %error, "Model call failed, retries exhausted");
                return Err(error);
            };
            debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %error, "Retrying model call");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn filtered_response() -> LlmResponse {
    LlmResponse {
        content: Vec::new(),
        stop_reason: Some(StopReason::ContentFilter),
        model: None,
    }
}

fn status_error(status: StatusCode, text: &str) -> GatewayError {
    let message = ErrorBody::parse(text)
        .map(|b| b.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| text.chars().take(500).collect());
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited(message),
        StatusCode::NOT_FOUND => GatewayError::ModelNotAvailable(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::Timeout,
        _ => GatewayError::RequestFailed(format!("HTTP {}: {}", status.as_u16(), message)),
    }
}

fn transport_error(error: &reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else if error.is_connect() || error.is_request() {
        GatewayError::ConnectionError(error.to_string())
    } else {
        GatewayError::RequestFailed(error.to_string())
    }
}

/// Forward SSE events as [`StreamEvent`]s until the stream ends or the
/// receiver goes away.
async fn pump(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut events = response.bytes_stream().eventsource();
    let mut acc = StreamAccumulator::default();

    while let Some(next) = events.next().await {
        let event = match next {
            Ok(event) => event,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(format!("SSE stream error: {e}"))).await;
                return;
            }
        };
        let payload = event.data.trim();
        if payload.is_empty() {
            continue;
        }
        if payload == SSE_DONE {
            break;
        }
        trace!(chunk = %payload, "Stream chunk");
        let parsed = match serde_json::from_str::<StreamChunk>(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable stream chunk");
                continue;
            }
        };
        if let Some(delta) = acc.push(parsed)
            && tx.send(StreamEvent::Delta(delta)).await.is_err()
        {
            return;
        }
    }

    let _ = tx.send(StreamEvent::Completed(acc.finish())).await;
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn send(&self, request: ModelRequest) -> Result<LlmResponse, GatewayError> {
        let (url, body) = self.body(&request, false);
        match self.post(&url, &body).await? {
            Reply::Filtered => Ok(filtered_response()),
            Reply::Ok(response) => {
                let text = response.text().await.map_err(|e| transport_error(&e))?;
                let parsed: ChatResponse = serde_json::from_str(&text)
                    .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
                Ok(parsed.into_llm_response())
            }
        }
    }

    async fn send_streaming(&self, request: ModelRequest) -> Result<StreamHandle, GatewayError> {
        let (url, body) = self.body(&request, true);
        let reply = self.post(&url, &body).await?;
        let (tx, rx) = mpsc::channel(64);
        match reply {
            Reply::Filtered => {
                let _ = tx.send(StreamEvent::Completed(filtered_response())).await;
            }
            Reply::Ok(response) => {
                tokio::spawn(pump(response, tx));
            }
        }
        Ok(StreamHandle::new(rx))
    }
}
