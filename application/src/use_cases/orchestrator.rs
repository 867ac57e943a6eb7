//! Orchestrator use case.
//!
//! One request end to end: load (or create) the conversation, summarize
//! its history into the agent prompts, build the configured strategy, run
//! the group chat, synthesize the answer and persist the exchange exactly
//! once. Failures never escape as errors; they become a degraded
//! [`AnswerEnvelope`] with the detail in `thoughts` and the logs.

use crate::config::ExecutionParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::conversation_store::{ConversationStore, ConversationStoreError};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::template_store::TemplateStore;
use crate::ports::tool_executor::ToolExecutorPort;
use crate::ports::tool_schema::ToolSchemaPort;
use crate::use_cases::group_chat::{
    EngineError, EngineEventSender, EngineFailure, GroupChatEngine, GroupChatOutcome,
    GroupChatRun,
};
use crate::use_cases::strategies::{
    CONVERSATION_SUMMARY_PLACEHOLDER, StrategyError, StrategyRegistry,
};
use crate::use_cases::summarize::SummarizeHistoryUseCase;
use orc_domain::util::short_id;
use orc_domain::{
    AnswerEnvelope, Conversation, Credentials, Interaction, Question, ResponseSynthesizer,
    StrategyConfig, StrategyKind, ToolContext,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Conversation store error: {0}")]
    Store(#[from] ConversationStoreError),

    #[error("Strategy setup failed: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Group chat failed: {0}")]
    Engine(#[from] EngineError),
}

/// One user ask with the caller's identity.
#[derive(Debug, Clone)]
pub struct AskRequest {
    /// Existing conversation to continue; a fresh id is minted when absent
    pub conversation_id: Option<String>,
    pub question: Question,
    pub credentials: Credentials,
}

impl AskRequest {
    pub fn new(question: Question, credentials: Credentials) -> Self {
        Self {
            conversation_id: None,
            question,
            credentials,
        }
    }

    pub fn with_conversation_id(mut self, id: Option<String>) -> Self {
        self.conversation_id = id.filter(|id| !id.trim().is_empty());
        self
    }

    /// The id this request will run under.
    pub fn resolve_conversation_id(&self) -> String {
        match &self.conversation_id {
            Some(id) => id.trim().to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                info!(conversation = %short_id(&id), "Creating new conversation id");
                id
            }
        }
    }
}

/// How one exchange ended, after persistence.
#[derive(Debug, Clone)]
pub(crate) struct ExchangeEnd {
    pub envelope: AnswerEnvelope,
    /// The envelope is the processing-error fallback
    pub failed: bool,
}

#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) engine: GroupChatEngine,
    store: Arc<dyn ConversationStore>,
    strategies: StrategyRegistry,
    summarizer: SummarizeHistoryUseCase,
    synthesizer: Arc<ResponseSynthesizer>,
    conversation_logger: Arc<dyn ConversationLogger>,
    strategy: String,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tool_executor: Arc<dyn ToolExecutorPort>,
        tool_schema: Arc<dyn ToolSchemaPort>,
        store: Arc<dyn ConversationStore>,
        templates: Arc<dyn TemplateStore>,
    ) -> Self {
        let params = ExecutionParams::default();
        Self {
            summarizer: SummarizeHistoryUseCase::new(gateway.clone()),
            engine: GroupChatEngine::new(gateway, tool_executor, tool_schema),
            store,
            strategies: StrategyRegistry::new(templates),
            synthesizer: Arc::new(ResponseSynthesizer::new(params.terminate_marker)),
            conversation_logger: Arc::new(NoConversationLogger),
            strategy: StrategyKind::default().as_str().to_string(),
        }
    }

    /// Strategy used for every request; names are normalized.
    pub fn with_strategy(mut self, name: impl AsRef<str>) -> Self {
        self.strategy = StrategyKind::normalize(name.as_ref());
        self
    }

    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        self.synthesizer = Arc::new(ResponseSynthesizer::new(params.terminate_marker.as_str()));
        self.engine = self.engine.with_params(params);
        self
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.strategies = registry;
        self
    }

    pub fn with_summarizer(mut self, summarizer: SummarizeHistoryUseCase) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.engine = self.engine.with_conversation_logger(logger.clone());
        self.conversation_logger = logger;
        self
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn params(&self) -> &ExecutionParams {
        self.engine.params()
    }

    /// Closing agent of the configured strategy, if the strategy is known.
    pub fn closing_agent(&self) -> Option<String> {
        self.strategies
            .blueprint(&self.strategy)
            .ok()
            .map(|b| b.closing_agent.to_string())
    }

    /// Whether the closing agent replies with the JSON answer contract.
    pub fn closing_answers_json(&self) -> bool {
        self.strategies
            .blueprint(&self.strategy)
            .ok()
            .and_then(|b| b.closing_contract())
            .is_some_and(|contract| contract.requires_json())
    }

    /// Answer one ask. Never fails; see the module docs.
    pub async fn answer(&self, request: AskRequest) -> AnswerEnvelope {
        let conversation_id = request.resolve_conversation_id();
        let cancel = CancellationToken::new();
        match self
            .exchange(&request, &conversation_id, None, &cancel)
            .await
        {
            Some(end) => end.envelope,
            None => AnswerEnvelope::degraded(conversation_id, EngineError::Cancelled),
        }
    }

    /// Run and persist one exchange. `None` when cancelled before the
    /// engine reached a terminal state; nothing is persisted then.
    pub(crate) async fn exchange(
        &self,
        request: &AskRequest,
        conversation_id: &str,
        events: Option<&EngineEventSender>,
        cancel: &CancellationToken,
    ) -> Option<ExchangeEnd> {
        let started = Instant::now();
        let short = short_id(conversation_id);

        let conversation = match self.store.get_or_create(conversation_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                error!(conversation = %short, error = %e, "Failed to load conversation");
                return Some(ExchangeEnd {
                    envelope: AnswerEnvelope::degraded(conversation_id, OrchestratorError::from(e)),
                    failed: true,
                });
            }
        };
        info!(
            conversation = %short,
            strategy = %self.strategy,
            prior_messages = conversation.history.len(),
            "Answering"
        );

        let (envelope, failed) = match self.build_strategy(&conversation).await {
            Err(e) => {
                error!(conversation = %short, error = %e, "Strategy setup failed");
                (AnswerEnvelope::degraded(conversation_id, e), true)
            }
            Ok(strategy) => {
                if cancel.is_cancelled() {
                    return None;
                }
                let context = ToolContext::new(request.credentials.clone())
                    .with_conversation_id(conversation_id);
                let outcome = self
                    .engine
                    .run(
                        &strategy,
                        GroupChatRun {
                            ask: request.question.content(),
                            context: &context,
                            events,
                            cancel,
                        },
                    )
                    .await;
                match outcome {
                    Err(failure) if failure.error.is_cancelled() => return None,
                    outcome => self.synthesize(conversation_id, &strategy, outcome),
                }
            }
        };

        self.persist(conversation, request, &envelope, started).await;
        info!(
            conversation = %short,
            elapsed_ms = started.elapsed().as_millis() as u64,
            degraded = failed,
            "Generated response"
        );
        Some(ExchangeEnd { envelope, failed })
    }

    async fn build_strategy(
        &self,
        conversation: &Conversation,
    ) -> Result<StrategyConfig, OrchestratorError> {
        let summary = self.summarizer.execute(conversation).await;
        let placeholders =
            HashMap::from([(CONVERSATION_SUMMARY_PLACEHOLDER.to_string(), summary)]);
        let strategy = self
            .strategies
            .build(&self.strategy, &placeholders, self.engine.params())
            .await?;
        Ok(strategy)
    }

    fn synthesize(
        &self,
        conversation_id: &str,
        strategy: &StrategyConfig,
        outcome: Result<GroupChatOutcome, EngineFailure>,
    ) -> (AnswerEnvelope, bool) {
        match outcome {
            Ok(outcome) if outcome.was_filtered() => {
                let thoughts = self
                    .synthesizer
                    .synthesize(conversation_id, &outcome.transcript, strategy.closing_agent())
                    .thoughts;
                (
                    AnswerEnvelope::content_filtered(conversation_id).with_thoughts(thoughts),
                    false,
                )
            }
            Ok(outcome) => (
                self.synthesizer.synthesize(
                    conversation_id,
                    &outcome.transcript,
                    strategy.closing_agent(),
                ),
                false,
            ),
            Err(failure) => {
                error!(
                    conversation = %short_id(conversation_id),
                    error = %failure.error,
                    transcript = %failure.transcript.render(),
                    "Group chat failed"
                );
                (
                    AnswerEnvelope::degraded(
                        conversation_id,
                        OrchestratorError::from(failure.error),
                    ),
                    true,
                )
            }
        }
    }

    /// Fold the exchange into the record and write it. Store failures are
    /// logged; the caller still gets its answer.
    async fn persist(
        &self,
        mut conversation: Conversation,
        request: &AskRequest,
        envelope: &AnswerEnvelope,
        started: Instant,
    ) {
        let interaction = Interaction::new(
            request.credentials.principal_id.as_str(),
            request.credentials.principal_name.as_str(),
            started.elapsed().as_secs_f64(),
        )
        .with_answer(
            envelope.answer.as_str(),
            envelope.reasoning.as_str(),
            envelope.data_points.clone(),
        );

        self.conversation_logger.log(
            ConversationEvent::new(
                "answer",
                json!({
                    "question": request.question.content(),
                    "answer": envelope.answer,
                    "reasoning": envelope.reasoning,
                    "data_points": envelope.data_points,
                    "response_time": interaction.response_time,
                }),
            )
            .for_conversation(&conversation.id),
        );

        conversation.record_exchange(
            request.question.content(),
            envelope.answer.as_str(),
            interaction,
        );
        let id = conversation.id.clone();
        if let Err(e) = self.store.update(conversation).await {
            warn!(conversation = %short_id(&id), error = %e, "Failed to persist conversation");
        }
    }
}
