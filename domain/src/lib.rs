//! Domain layer for orc
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Group chat
//!
//! A user ask is answered by a team of agents taking turns over a shared
//! [`Transcript`]. A [`StrategyConfig`] fixes the team, the
//! [`TurnSelector`] decides who speaks next, and a
//! [`TerminationCondition`] decides when the exchange is over.
//!
//! ## Synthesis
//!
//! The finished transcript is reduced by the [`ResponseSynthesizer`] to one
//! [`AnswerEnvelope`], with citations collected by the
//! [`DataPointExtractor`].

pub mod agent;
pub mod conversation;
pub mod core;
pub mod prompt;
pub mod session;
pub mod strategy;
pub mod synthesis;
pub mod tool;
pub mod transcript;
pub mod util;

// Re-export commonly used types
pub use agent::{AgentDefinition, AgentKind, ModelParams, ResponseContract};
pub use conversation::{Conversation, ConversationData, HistoryEntry, HistoryRole, Interaction};
pub use core::{credentials::Credentials, error::DomainError, question::Question};
pub use prompt::{CONVERSATION_JUST_STARTED, PromptTemplate, SummaryPrompt};
pub use session::{
    response::{ContentBlock, LlmResponse, StopReason},
    stream::StreamEvent,
};
pub use strategy::{
    AllowListSelector, DEFAULT_TERMINATE_MARKER, NextSpeaker, RoutingSelector, SpeakerSelector,
    StrategyConfig, StrategyKind, TerminationCondition, TerminationReason, TurnSelector,
};
pub use synthesis::{
    AnswerEnvelope, AnswerFieldFilter, DataPointExtractor, MarkerFilter, ResponseSynthesizer,
};
pub use tool::{
    ToolCall, ToolContext, ToolDefinition, ToolError, ToolHandler, ToolParameter, ToolResult,
    ToolSafety, ToolSpec,
};
pub use transcript::{Message, MessageBody, ToolOutput, Transcript, USER_SPEAKER};
