//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Configuration variants are raised while a strategy is being assembled,
/// before any model call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Prompt for agent '{agent}' not found in strategy '{strategy}'")]
    MissingPrompt { strategy: String, agent: String },

    #[error("Agent '{0}' is defined more than once")]
    DuplicateAgent(String),

    #[error("Agent '{0}' can never be selected")]
    UnreachableAgent(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("Orchestration error: {0}")]
    OrchestrationError(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    /// Errors caused by a bad strategy setup rather than a runtime failure
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DomainError::UnknownStrategy(_)
                | DomainError::MissingPrompt { .. }
                | DomainError::DuplicateAgent(_)
                | DomainError::UnreachableAgent(_)
                | DomainError::UnknownAgent(_)
                | DomainError::InvalidStrategy(_)
        )
    }
}
