//! Chat-completion wire format.
//!
//! Converts a [`ModelRequest`] into the OpenAI-compatible request body and
//! the endpoint's replies (whole or streamed) back into [`LlmResponse`]s.

use orc_application::ModelRequest;
use orc_domain::{ContentBlock, LlmResponse, Message, MessageBody, StopReason, USER_SPEAKER};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

// ==================== Request ====================

/// Build the JSON body for `request`.
///
/// The calling agent's own turns are replayed as `assistant` messages with
/// their tool round trips intact; other participants' turns become `user`
/// messages carrying the speaker's `name`. Tool results whose request fell
/// outside the window are dropped, since the endpoint rejects orphans.
pub fn request_body(request: &ModelRequest, default_deployment: &str, stream: bool) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": request.system_prompt })];
    let own = request.agent.as_deref();
    let mut open_calls: HashSet<&str> = HashSet::new();

    for message in &request.messages {
        let is_own = own == Some(message.speaker.as_str());
        match (&message.body, is_own) {
            (MessageBody::ToolCallRequest(calls), true) => {
                let tool_calls: Vec<Value> = calls
                    .iter()
                    .map(|call| {
                        open_calls.insert(call.id.as_str());
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.tool_name,
                                "arguments": Value::Object(
                                    call.arguments.clone().into_iter().collect()
                                ).to_string(),
                            }
                        })
                    })
                    .collect();
                messages.push(json!({ "role": "assistant", "content": Value::Null, "tool_calls": tool_calls }));
            }
            (MessageBody::ToolCallResult(outputs), true) => {
                for output in outputs {
                    if open_calls.remove(output.call_id.as_str()) {
                        messages.push(json!({
                            "role": "tool",
                            "tool_call_id": output.call_id,
                            "content": output.content,
                        }));
                    }
                }
            }
            (MessageBody::Text(text), true) => {
                messages.push(json!({ "role": "assistant", "content": text }));
            }
            (MessageBody::Text(text), false) if message.speaker == USER_SPEAKER => {
                messages.push(json!({ "role": "user", "content": text }));
            }
            (_, false) => messages.push(foreign_message(message)),
        }
    }

    let mut body = json!({
        "model": request.params.deployment.as_deref().unwrap_or(default_deployment),
        "messages": messages,
        "temperature": request.params.temperature,
        "max_tokens": request.params.max_tokens,
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(request.tools.clone());
    }
    if request.json_response {
        body["response_format"] = json!({ "type": "json_object" });
    }
    if stream {
        body["stream"] = Value::Bool(true);
    }
    body
}

/// Another participant's turn, as user input attributed by `name`.
fn foreign_message(message: &Message) -> Value {
    let content = match &message.body {
        MessageBody::Text(text) => text.clone(),
        _ => message.render(),
    };
    json!({ "role": "user", "name": participant_name(&message.speaker), "content": content })
}

/// The `name` field only accepts `[a-zA-Z0-9_-]`.
fn participant_name(speaker: &str) -> String {
    speaker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(64)
        .collect()
}

// ==================== Response ====================

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    pub function: WireFunction,
}

#[derive(Debug, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl ChatResponse {
    pub fn into_llm_response(self) -> LlmResponse {
        let mut choices = self.choices.into_iter();
        let Some(choice) = choices.next() else {
            return response(Vec::new(), None, self.model);
        };
        let message = choice.message.unwrap_or_default();
        let mut content = Vec::new();
        if let Some(text) = message.content.filter(|t| !t.is_empty()) {
            content.push(ContentBlock::Text(text));
        }
        for call in message.tool_calls {
            content.push(tool_use(call.id, call.function.name, &call.function.arguments));
        }
        response(content, choice.finish_reason.as_deref().map(stop_reason), self.model)
    }
}

pub fn stop_reason(finish_reason: &str) -> StopReason {
    match finish_reason {
        "stop" => StopReason::EndTurn,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        other => StopReason::Other(other.to_string()),
    }
}

fn tool_use(id: String, name: String, arguments: &str) -> ContentBlock {
    let input: HashMap<String, Value> = if arguments.trim().is_empty() {
        HashMap::new()
    } else {
        match serde_json::from_str::<Map<String, Value>>(arguments) {
            Ok(map) => map.into_iter().collect(),
            Err(e) => {
                warn!(tool = %name, error = %e, "Unparseable tool arguments");
                HashMap::new()
            }
        }
    };
    ContentBlock::ToolUse { id, name, input }
}

fn response(content: Vec<ContentBlock>, stop: Option<StopReason>, model: Option<String>) -> LlmResponse {
    LlmResponse {
        content,
        stop_reason: stop,
        model,
    }
}

/// An error body; `code == "content_filter"` means the prompt itself was blocked.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ErrorBody {
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }

    pub fn is_content_filter(&self) -> bool {
        self.error.code.as_deref() == Some("content_filter")
    }
}

// ==================== Streaming ====================

#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds streamed chunks into the final response.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    calls: BTreeMap<usize, PartialCall>,
    finish_reason: Option<String>,
    model: Option<String>,
}

impl StreamAccumulator {
    /// Absorb one chunk; returns its text delta, if any.
    pub fn push(&mut self, chunk: StreamChunk) -> Option<String> {
        if chunk.model.is_some() {
            self.model = chunk.model;
        }
        let mut delta_text = String::new();
        for choice in chunk.choices {
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
            let Some(delta) = choice.delta else { continue };
            if let Some(text) = delta.content {
                delta_text.push_str(&text);
            }
            for call in delta.tool_calls {
                let partial = self.calls.entry(call.index).or_default();
                if let Some(id) = call.id {
                    partial.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name {
                        partial.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial.arguments.push_str(&arguments);
                    }
                }
            }
        }
        self.text.push_str(&delta_text);
        (!delta_text.is_empty()).then_some(delta_text)
    }

    pub fn finish(self) -> LlmResponse {
        let mut content = Vec::new();
        if !self.text.is_empty() {
            content.push(ContentBlock::Text(self.text));
        }
        for (_, call) in self.calls {
            content.push(tool_use(call.id, call.name, &call.arguments));
        }
        response(content, self.finish_reason.as_deref().map(stop_reason), self.model)
    }
}

/// Payload marking the end of the stream.
pub const SSE_DONE: &str = "[DONE]";

#[cfg(test)]
mod tests {
    use super::*;
    use orc_domain::{ToolCall, ToolOutput};

    fn request_with(messages: Vec<Message>) -> ModelRequest {
        ModelRequest::new("You are helpful.")
            .with_agent("assistant")
            .with_messages(messages)
    }

    #[test]
    fn test_roles_follow_the_calling_agent() {
        let call = ToolCall::new("call_1", "get_time");
        let request = request_with(vec![
            Message::user("What time is it?"),
            Message::tool_request("assistant", vec![call]),
            Message::tool_result(
                "assistant",
                vec![ToolOutput::ok("call_1", "get_time", "The current time is 10:00")],
            ),
            Message::text("assistant", "It is 10:00."),
            Message::text("chat closure", "Done."),
        ]);
        let body = request_body(&request, "gpt-4o", false);
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "get_time");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], "{}");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(messages[4]["role"], "assistant");
        assert_eq!(messages[5]["role"], "user");
        assert_eq!(messages[5]["name"], "chat_closure");
        assert_eq!(body["model"], "gpt-4o");
        assert!(body.get("stream").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_orphan_tool_result_is_dropped() {
        let request = request_with(vec![Message::tool_result(
            "assistant",
            vec![ToolOutput::ok("call_9", "get_time", "10:00")],
        )]);
        let body = request_body(&request, "gpt-4o", true);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_other_agents_tool_events_are_rendered() {
        let request = ModelRequest::new("Close the chat.")
            .with_agent("chat_closure")
            .with_messages(vec![Message::tool_result(
                "assistant",
                vec![ToolOutput::ok("c1", "vector_index_retrieve", "policy.pdf: 30 days")],
            )])
            .with_json_response(true);
        let body = request_body(&request, "gpt-4o", false);
        let rendered = &body["messages"][1];
        assert_eq!(rendered["role"], "user");
        assert!(rendered["content"].as_str().unwrap().contains("policy.pdf: 30 days"));
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let raw = r#"{
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "vector_index_retrieve", "arguments": "{\"input\":\"refunds\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let response = response.into_llm_response();
        let calls = response.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get_string("input"), Some("refunds"));
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
    }

    #[test]
    fn test_content_filter_finish_reason() {
        let raw = r#"{"choices":[{"message":{"content":""},"finish_reason":"content_filter"}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(response.into_llm_response().was_filtered());
    }

    #[test]
    fn test_stream_accumulates_text_and_calls() {
        let mut acc = StreamAccumulator::default();
        let chunks = [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"c1","function":{"name":"get_time","arguments":"{\"a\""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":":1}"}}]},"finish_reason":"tool_calls"}]}"#,
        ];
        let deltas: Vec<Option<String>> = chunks
            .iter()
            .map(|c| acc.push(serde_json::from_str(c).unwrap()))
            .collect();
        assert_eq!(deltas[1].as_deref(), Some("Hel"));
        assert!(deltas[3].is_none());

        let response = acc.finish();
        assert_eq!(response.text_content(), "Hello");
        let calls = response.tool_calls();
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].get_i64("a"), Some(1));
    }

    #[test]
    fn test_error_body_content_filter() {
        let body = ErrorBody::parse(
            r#"{"error":{"code":"content_filter","message":"The prompt was filtered"}}"#,
        )
        .unwrap();
        assert!(body.is_content_filter());
    }
}
