//! Application layer for orc
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutionParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    conversation_store::{ConversationStore, ConversationStoreError},
    llm_gateway::{GatewayError, LlmGateway, ModelRequest, StreamHandle},
    query_engine::{NoQueryEngine, QueryEngine, QueryError, QueryLanguage, QueryRows},
    search_backend::{NoSearchBackend, SearchBackend, SearchError, SearchHit, SearchQuery},
    template_store::{TemplateError, TemplateStore},
    tool_executor::ToolExecutorPort,
    tool_schema::ToolSchemaPort,
};
pub use use_cases::group_chat::{
    EngineError, EngineEvent, GroupChatEngine, GroupChatOutcome, GroupChatRun, StopCause,
};
pub use use_cases::orchestrator::{AskRequest, Orchestrator, OrchestratorError};
pub use use_cases::strategies::{StrategyError, StrategyRegistry};
pub use use_cases::stream_answer::{StreamFrame, StreamOptions};
pub use use_cases::summarize::SummarizeHistoryUseCase;
