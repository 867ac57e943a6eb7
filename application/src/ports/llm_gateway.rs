//! LLM Gateway port
//!
//! Defines the interface for talking to the chat-completion endpoint that
//! backs every agent turn and the one-shot history summary.

use async_trait::async_trait;
use orc_domain::{LlmResponse, Message, ModelParams, StreamEvent, Transcript};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Whether the same request may succeed if sent again after a pause.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::ConnectionError(_) | GatewayError::RateLimited(_) | GatewayError::Timeout
        )
    }
}

/// One request to the model endpoint.
///
/// `messages` is already windowed by the caller; the gateway sends exactly
/// what it is given.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Tool schemas as produced by [`ToolSchemaPort`](super::tool_schema::ToolSchemaPort).
    pub tools: Vec<Value>,
    pub params: ModelParams,
    /// Ask the endpoint for a JSON object response.
    pub json_response: bool,
    /// Agent making the call; its own messages are replayed as the
    /// assistant's, everyone else's as user input.
    pub agent: Option<String>,
}

impl ModelRequest {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            tools: Vec::new(),
            params: ModelParams::default(),
            json_response: false,
            agent: None,
        }
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages = messages.into_iter().collect();
        self
    }

    /// Take the trailing `window` messages of a transcript.
    pub fn with_window(self, transcript: &Transcript, window: usize) -> Self {
        self.with_messages(transcript.window(window).iter().cloned())
    }

    pub fn with_user_message(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::user(text));
        self
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_json_response(mut self, json_response: bool) -> Self {
        self.json_response = json_response;
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with the model.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Send a request and wait for the full response.
    async fn send(&self, request: ModelRequest) -> Result<LlmResponse, GatewayError>;

    /// Send a request and get a streaming response.
    ///
    /// Default implementation calls `send()` and wraps the result in a single
    /// `Completed` event, so non-streaming adapters work unchanged.
    async fn send_streaming(&self, request: ModelRequest) -> Result<StreamHandle, GatewayError> {
        let response = self.send(request).await?;
        let (tx, rx) = mpsc::channel(1);
        // Receiver may already be gone
        let _ = tx.send(StreamEvent::Completed(response)).await;
        Ok(StreamHandle::new(rx))
    }
}

/// Handle for receiving streaming events from the model.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` and provides convenience methods
/// for consuming the stream.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Consume the stream, forwarding each text delta to `on_delta`, and
    /// return the completed response.
    ///
    /// When the adapter only sent deltas before closing the channel, the
    /// response is assembled from them.
    pub async fn collect_with<F>(mut self, mut on_delta: F) -> Result<LlmResponse, GatewayError>
    where
        F: FnMut(&str),
    {
        let mut full_text = String::new();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => {
                    on_delta(&chunk);
                    full_text.push_str(&chunk);
                }
                StreamEvent::Completed(response) => {
                    if response.text_content().is_empty()
                        && !response.has_tool_calls()
                        && !full_text.is_empty()
                    {
                        return Ok(LlmResponse::from_text(full_text));
                    }
                    return Ok(response);
                }
                StreamEvent::Error(e) => {
                    return Err(GatewayError::RequestFailed(e));
                }
            }
        }
        // Channel closed without Completed
        if full_text.is_empty() {
            return Err(GatewayError::TransportClosed);
        }
        Ok(LlmResponse::from_text(full_text))
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(self) -> Result<String, GatewayError> {
        self.collect_with(|_| {}).await.map(|r| r.text_content())
    }
}
