//! Group chat engine.
//!
//! Drives one user ask through a [`StrategyConfig`]:
//!
//! 1. Seed the transcript with the ask
//! 2. Ask the selector who speaks next (or stop)
//! 3. Invoke that agent with its prompt, the trailing window of the
//!    transcript and its tool schemas
//! 4. Tool-call requests are dispatched, results appended, and the same
//!    agent re-invoked (bounded by `max_tool_iterations`)
//! 5. Re-check termination after every append; the round cap bounds the
//!    whole exchange regardless of selector behaviour
//!
//! Tool failures never abort the loop. Model failures and selector
//! inconsistencies do, returning the transcript accumulated so far.

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::llm_gateway::{GatewayError, LlmGateway, ModelRequest};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::tool_schema::ToolSchemaPort;
use orc_domain::util::truncate_str;
use orc_domain::{
    AgentDefinition, DomainError, LlmResponse, Message, StrategyConfig, TerminationReason,
    ToolCall, ToolContext, ToolOutput, Transcript, TurnSelector,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Text recorded when an agent keeps calling tools past its budget.
pub const TOOL_LIMIT_NOTICE: &str = "Tool iteration limit reached without a final response.";

/// Observer channel for a running exchange.
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// What the engine reports while it runs, in production order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Partial output of an agent (streaming requests only)
    TextDelta { speaker: String, delta: String },
    ToolCallRequest { speaker: String, calls: Vec<ToolCall> },
    ToolCallResult { speaker: String, results: Vec<ToolOutput> },
    /// A complete text message appended to the transcript
    AgentMessage { speaker: String, text: String },
    /// The text the answer will be synthesized from
    Final { speaker: String, text: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Model call for agent '{agent}' failed: {source}")]
    Gateway {
        agent: String,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Group chat cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

/// An aborted exchange, with everything produced before the failure.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct EngineFailure {
    pub error: EngineError,
    pub transcript: Transcript,
}

/// Why a completed exchange stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum StopCause {
    /// The selector handed the turn back
    Selector,
    /// The closing agent produced its answer
    ClosingAgent,
    Termination(TerminationReason),
    /// `max_rounds` agent messages were produced
    RoundCap,
    /// The model provider withheld an agent's output
    ContentFiltered { speaker: String },
}

#[derive(Debug, Clone)]
pub struct GroupChatOutcome {
    pub transcript: Transcript,
    pub stop: StopCause,
}

impl GroupChatOutcome {
    pub fn was_filtered(&self) -> bool {
        matches!(self.stop, StopCause::ContentFiltered { .. })
    }
}

/// Per-run inputs besides the strategy.
pub struct GroupChatRun<'a> {
    pub ask: &'a str,
    pub context: &'a ToolContext,
    pub events: Option<&'a EngineEventSender>,
    pub cancel: &'a CancellationToken,
}

enum TurnEnd {
    Spoke,
    Stopped(StopCause),
}

/// Runs group chats. Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct GroupChatEngine {
    gateway: Arc<dyn LlmGateway>,
    tool_executor: Arc<dyn ToolExecutorPort>,
    tool_schema: Arc<dyn ToolSchemaPort>,
    conversation_logger: Arc<dyn ConversationLogger>,
    params: ExecutionParams,
}

impl GroupChatEngine {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tool_executor: Arc<dyn ToolExecutorPort>,
        tool_schema: Arc<dyn ToolSchemaPort>,
    ) -> Self {
        Self {
            gateway,
            tool_executor,
            tool_schema,
            conversation_logger: Arc::new(NoConversationLogger),
            params: ExecutionParams::default(),
        }
    }

    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        self.params = params;
        self
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn gateway(&self) -> Arc<dyn LlmGateway> {
        self.gateway.clone()
    }

    /// Run one exchange to completion.
    pub async fn run(
        &self,
        strategy: &StrategyConfig,
        run: GroupChatRun<'_>,
    ) -> Result<GroupChatOutcome, EngineFailure> {
        let mut transcript = Transcript::with_ask(run.ask);
        info!(
            strategy = %strategy.name(),
            max_rounds = strategy.max_rounds(),
            "Starting group chat"
        );

        let result = self.drive(strategy, &run, &mut transcript).await;
        match result {
            Ok(stop) => {
                info!(
                    strategy = %strategy.name(),
                    messages = transcript.len(),
                    stop = ?stop,
                    "Group chat finished"
                );
                if let Some((speaker, text)) = final_text(&transcript, strategy.closing_agent()) {
                    emit(run.events, EngineEvent::Final { speaker, text });
                }
                Ok(GroupChatOutcome { transcript, stop })
            }
            Err(error) => {
                if error.is_cancelled() {
                    info!(strategy = %strategy.name(), "Group chat cancelled");
                } else {
                    warn!(
                        strategy = %strategy.name(),
                        messages = transcript.len(),
                        error = %error,
                        "Group chat aborted"
                    );
                }
                Err(EngineFailure { error, transcript })
            }
        }
    }

    async fn drive(
        &self,
        strategy: &StrategyConfig,
        run: &GroupChatRun<'_>,
        transcript: &mut Transcript,
    ) -> Result<StopCause, EngineError> {
        loop {
            if run.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if let Some(stop) = check_stop(strategy, transcript) {
                return Ok(stop);
            }

            let next = strategy.selector().select(transcript);
            let Some(agent) = strategy.resolve(&next)? else {
                return Ok(StopCause::Selector);
            };
            debug!(agent = %agent.name, next = ?next, "Selected speaker");

            match self.take_turn(strategy, agent, run, transcript).await? {
                TurnEnd::Stopped(stop) => return Ok(stop),
                TurnEnd::Spoke if agent.name == strategy.closing_agent() => {
                    return Ok(StopCause::ClosingAgent);
                }
                TurnEnd::Spoke => {}
            }
        }
    }

    /// One agent turn, including its tool round trips.
    async fn take_turn(
        &self,
        strategy: &StrategyConfig,
        agent: &AgentDefinition,
        run: &GroupChatRun<'_>,
        transcript: &mut Transcript,
    ) -> Result<TurnEnd, EngineError> {
        let tools = self
            .tool_schema
            .tools_schema(self.tool_executor.tool_spec(), &agent.tools);
        let json_response = agent.response_contract.requires_json() && tools.is_empty();
        let mut iterations = 0;

        loop {
            let request = ModelRequest::new(agent.system_prompt.as_str())
                .with_agent(agent.name.as_str())
                .with_window(transcript, self.params.history_window)
                .with_tools(tools.clone())
                .with_params(agent.model.clone())
                .with_json_response(json_response);

            let response = tokio::select! {
                biased;
                _ = run.cancel.cancelled() => return Err(EngineError::Cancelled),
                response = self.call_model(agent, request, run.events) => response?,
            };

            if response.was_filtered() {
                warn!(agent = %agent.name, "Agent output withheld by content filter");
                return Ok(TurnEnd::Stopped(StopCause::ContentFiltered {
                    speaker: agent.name.clone(),
                }));
            }

            let calls = response.tool_calls();
            let text = response.text_content();

            if calls.is_empty() || iterations >= self.params.max_tool_iterations {
                let text = if calls.is_empty() {
                    text
                } else {
                    warn!(
                        agent = %agent.name,
                        max = self.params.max_tool_iterations,
                        "Tool iteration limit reached"
                    );
                    if text.trim().is_empty() {
                        TOOL_LIMIT_NOTICE.to_string()
                    } else {
                        text
                    }
                };
                if let Some(stop) = self.append_text(strategy, agent, text, run, transcript) {
                    return Ok(TurnEnd::Stopped(stop));
                }
                return Ok(TurnEnd::Spoke);
            }

            if !text.trim().is_empty()
                && let Some(stop) = self.append_text(strategy, agent, text, run, transcript)
            {
                return Ok(TurnEnd::Stopped(stop));
            }

            iterations += 1;
            transcript.push(Message::tool_request(agent.name.as_str(), calls.clone()));
            emit(
                run.events,
                EngineEvent::ToolCallRequest {
                    speaker: agent.name.clone(),
                    calls: calls.clone(),
                },
            );
            if let Some(stop) = check_stop(strategy, transcript) {
                return Ok(TurnEnd::Stopped(stop));
            }

            let outputs = tokio::select! {
                biased;
                _ = run.cancel.cancelled() => return Err(EngineError::Cancelled),
                outputs = self.dispatch(agent, &calls, run.context) => outputs,
            };
            transcript.push(Message::tool_result(agent.name.as_str(), outputs.clone()));
            emit(
                run.events,
                EngineEvent::ToolCallResult {
                    speaker: agent.name.clone(),
                    results: outputs,
                },
            );
            if let Some(stop) = check_stop(strategy, transcript) {
                return Ok(TurnEnd::Stopped(stop));
            }
        }
    }

    async fn call_model(
        &self,
        agent: &AgentDefinition,
        request: ModelRequest,
        events: Option<&EngineEventSender>,
    ) -> Result<LlmResponse, EngineError> {
        let gateway_error = |source| EngineError::Gateway {
            agent: agent.name.clone(),
            source,
        };
        match events {
            Some(tx) => {
                let handle = self
                    .gateway
                    .send_streaming(request)
                    .await
                    .map_err(gateway_error)?;
                handle
                    .collect_with(|delta| {
                        let _ = tx.send(EngineEvent::TextDelta {
                            speaker: agent.name.clone(),
                            delta: delta.to_string(),
                        });
                    })
                    .await
                    .map_err(gateway_error)
            }
            None => self.gateway.send(request).await.map_err(gateway_error),
        }
    }

    /// Run every call of one request concurrently; results keep call order.
    async fn dispatch(
        &self,
        agent: &AgentDefinition,
        calls: &[ToolCall],
        context: &ToolContext,
    ) -> Vec<ToolOutput> {
        let futures = calls.iter().map(|call| async move {
            if !agent.has_tool(&call.tool_name) {
                warn!(agent = %agent.name, tool = %call.tool_name, "Agent called a tool it does not hold");
            }
            self.tool_executor.execute(call, context).await
        });
        let results = futures::future::join_all(futures).await;

        calls
            .iter()
            .zip(results)
            .map(|(call, result)| {
                debug!(
                    agent = %agent.name,
                    tool = %call.tool_name,
                    success = result.is_success(),
                    "Tool call finished"
                );
                self.conversation_logger.log(ConversationEvent::new(
                    "tool_call",
                    json!({
                        "agent": agent.name,
                        "tool": call.tool_name,
                        "call_id": call.id,
                        "arguments": call.arguments,
                        "success": result.is_success(),
                        "output": truncate_str(&result.model_content(), 2000),
                    }),
                ));
                if result.is_success() {
                    ToolOutput::ok(&call.id, &call.tool_name, result.model_content())
                } else {
                    ToolOutput::error(&call.id, &call.tool_name, result.model_content())
                }
            })
            .collect()
    }

    fn append_text(
        &self,
        strategy: &StrategyConfig,
        agent: &AgentDefinition,
        text: String,
        run: &GroupChatRun<'_>,
        transcript: &mut Transcript,
    ) -> Option<StopCause> {
        debug!(
            agent = %agent.name,
            preview = %truncate_str(&text, 120),
            "Agent message"
        );
        self.conversation_logger.log(ConversationEvent::new(
            "agent_message",
            json!({ "agent": agent.name, "text": text }),
        ));
        transcript.push(Message::text(agent.name.as_str(), text.as_str()));
        emit(
            run.events,
            EngineEvent::AgentMessage {
                speaker: agent.name.clone(),
                text,
            },
        );
        check_stop(strategy, transcript)
    }
}

fn emit(events: Option<&EngineEventSender>, event: EngineEvent) {
    if let Some(tx) = events {
        // Observer may have gone away; the exchange continues regardless
        let _ = tx.send(event);
    }
}

fn check_stop(strategy: &StrategyConfig, transcript: &Transcript) -> Option<StopCause> {
    if transcript.agent_message_count() >= strategy.max_rounds() {
        return Some(StopCause::RoundCap);
    }
    strategy
        .termination()
        .reason(transcript)
        .map(StopCause::Termination)
}

fn final_text(transcript: &Transcript, closing_agent: &str) -> Option<(String, String)> {
    if let Some(text) = transcript.last_text_from(closing_agent) {
        return Some((closing_agent.to_string(), text.to_string()));
    }
    transcript
        .iter()
        .rev()
        .find(|m| m.is_agent_message() && m.as_text().is_some())
        .and_then(|m| Some((m.speaker.clone(), m.as_text()?.to_string())))
}
