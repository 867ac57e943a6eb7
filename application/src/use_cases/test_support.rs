//! Scripted port implementations shared by the use case tests.

use crate::ports::conversation_store::{ConversationStore, ConversationStoreError};
use crate::ports::llm_gateway::{GatewayError, LlmGateway, ModelRequest, StreamHandle};
use crate::ports::template_store::{TemplateError, TemplateStore};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::tool_schema::ToolSchemaPort;
use async_trait::async_trait;
use orc_domain::{
    Conversation, LlmResponse, StreamEvent, ToolCall, ToolContext, ToolDefinition, ToolError,
    ToolResult, ToolSafety, ToolSpec,
};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Replays canned responses in order; errors once the script runs out.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<LlmResponse>>,
    repeat: Option<LlmResponse>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Option<Duration>,
    /// Streamed fragments keyed by the full response text
    chunks: HashMap<String, Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<LlmResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
            delay: None,
            chunks: HashMap::new(),
        }
    }

    pub fn repeating(response: LlmResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(Vec::new())
        }
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stream the response whose text is `fragments.concat()` as one delta
    /// per fragment.
    pub fn with_chunks(mut self, fragments: &[&str]) -> Self {
        self.chunks.insert(
            fragments.concat(),
            fragments.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: ModelRequest) -> Result<LlmResponse, GatewayError> {
        self.requests.lock().unwrap().push(request);
        if let Some(response) = self.script.lock().unwrap().pop_front() {
            return Ok(response);
        }
        self.repeat
            .clone()
            .ok_or_else(|| GatewayError::Other("script exhausted".to_string()))
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn send(&self, request: ModelRequest) -> Result<LlmResponse, GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next(request)
    }

    /// Text arrives as one delta (or the registered fragments) followed by
    /// the completed response.
    async fn send_streaming(&self, request: ModelRequest) -> Result<StreamHandle, GatewayError> {
        let response = self.send(request).await?;
        let text = response.text_content();
        let fragments = match self.chunks.get(&text) {
            Some(fragments) => fragments.clone(),
            None if text.is_empty() => Vec::new(),
            None => vec![text],
        };
        let (tx, rx) = mpsc::channel(fragments.len() + 1);
        for fragment in fragments {
            let _ = tx.send(StreamEvent::Delta(fragment)).await;
        }
        let _ = tx.send(StreamEvent::Completed(response)).await;
        Ok(StreamHandle::new(rx))
    }
}

/// Succeeds with a fixed output per tool unless told to fail.
pub struct MockToolExecutor {
    spec: ToolSpec,
    outputs: HashMap<String, Result<String, ToolError>>,
    calls: Mutex<Vec<String>>,
}

impl MockToolExecutor {
    pub fn new(tools: &[&str]) -> Self {
        let spec = tools.iter().fold(ToolSpec::new(), |spec, name| {
            spec.register(ToolDefinition::new(*name, "test tool", ToolSafety::ReadOnly))
        });
        Self {
            spec,
            outputs: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_output(mut self, tool: &str, output: &str) -> Self {
        self.outputs.insert(tool.to_string(), Ok(output.to_string()));
        self
    }

    pub fn with_failure(mut self, tool: &str, error: ToolError) -> Self {
        self.outputs.insert(tool.to_string(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutorPort for MockToolExecutor {
    fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, call: &ToolCall, _context: &ToolContext) -> ToolResult {
        self.calls.lock().unwrap().push(call.tool_name.clone());
        if !self.spec.contains(&call.tool_name) {
            return ToolResult::failure(&call.tool_name, ToolError::not_found(&call.tool_name));
        }
        match self.outputs.get(&call.tool_name) {
            Some(Ok(output)) => ToolResult::success(&call.tool_name, output.as_str()),
            Some(Err(error)) => ToolResult::failure(&call.tool_name, error.clone()),
            None => ToolResult::success(&call.tool_name, "ok"),
        }
    }
}

/// Minimal function schema: name and description only.
pub struct SimpleSchema;

impl ToolSchemaPort for SimpleSchema {
    fn tool_to_schema(&self, tool: &ToolDefinition) -> Value {
        json!({ "name": tool.name, "description": tool.description })
    }

    fn all_tools_schema(&self, spec: &ToolSpec) -> Vec<Value> {
        let mut tools: Vec<_> = spec.all().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools.into_iter().map(|t| self.tool_to_schema(t)).collect()
    }
}

/// Returns `<strategy>/<agent>` as every prompt.
pub struct NamedTemplates;

#[async_trait]
impl TemplateStore for NamedTemplates {
    async fn load(
        &self,
        strategy: &str,
        agent: &str,
        _placeholders: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        Ok(format!("{strategy}/{agent}"))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Conversation>>,
    updates: Mutex<usize>,
}

impl MemoryStore {
    pub fn stored(&self, id: &str) -> Option<Conversation> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Conversation>, ConversationStoreError> {
        Ok(self.stored(id))
    }

    async fn create(&self, id: &str) -> Result<Conversation, ConversationStoreError> {
        let conversation = Conversation::new(id);
        self.records
            .lock()
            .unwrap()
            .insert(id.to_string(), conversation.clone());
        Ok(conversation)
    }

    async fn update(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, ConversationStoreError> {
        *self.updates.lock().unwrap() += 1;
        self.records
            .lock()
            .unwrap()
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }
}

/// Store whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl ConversationStore for BrokenStore {
    async fn get(&self, _id: &str) -> Result<Option<Conversation>, ConversationStoreError> {
        Err(ConversationStoreError::Backend("offline".to_string()))
    }

    async fn create(&self, _id: &str) -> Result<Conversation, ConversationStoreError> {
        Err(ConversationStoreError::Backend("offline".to_string()))
    }

    async fn update(
        &self,
        _conversation: Conversation,
    ) -> Result<Conversation, ConversationStoreError> {
        Err(ConversationStoreError::Backend("offline".to_string()))
    }
}
