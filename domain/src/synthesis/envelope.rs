//! The answer returned to callers

use serde::{Deserialize, Serialize};

/// Used when the closing JSON has no `answer` field.
pub const NO_ANSWER_PROVIDED: &str = "No answer provided.";

/// Used when the exchange produced no agent output at all.
pub const EMPTY_EXCHANGE_ANSWER: &str =
    "We had a problem answering your question. Please try again in a few minutes.";

/// Used when the model provider withheld the output.
pub const CONTENT_FILTERED_ANSWER: &str = "The content was blocked due to content filtering.";

/// Used for any internal failure; details only go to `thoughts` and logs.
pub const PROCESSING_ERROR_ANSWER: &str =
    "We encountered an issue processing your request. Please try again later.";

/// Final result of one request. `answer` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEnvelope {
    pub conversation_id: String,
    pub answer: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub data_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    /// Rendered transcript, or error detail for degraded answers
    #[serde(default)]
    pub thoughts: String,
}

impl AnswerEnvelope {
    pub fn new(conversation_id: impl Into<String>, answer: impl Into<String>) -> Self {
        let answer = answer.into();
        Self {
            conversation_id: conversation_id.into(),
            answer: if answer.trim().is_empty() {
                EMPTY_EXCHANGE_ANSWER.to_string()
            } else {
                answer
            },
            reasoning: String::new(),
            data_points: Vec::new(),
            sql_query: None,
            thoughts: String::new(),
        }
    }

    /// The fixed apology for an internal failure.
    pub fn degraded(conversation_id: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::new(conversation_id, PROCESSING_ERROR_ANSWER).with_thoughts(format!(
            "An error occurred while processing your request. Error details: {}",
            detail
        ))
    }

    pub fn content_filtered(conversation_id: impl Into<String>) -> Self {
        Self::new(conversation_id, CONTENT_FILTERED_ANSWER)
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_data_points(mut self, data_points: Vec<String>) -> Self {
        self.data_points = data_points;
        self
    }

    pub fn with_sql_query(mut self, query: Option<String>) -> Self {
        self.sql_query = query.filter(|q| !q.trim().is_empty());
        self
    }

    pub fn with_thoughts(mut self, thoughts: impl Into<String>) -> Self {
        self.thoughts = thoughts.into();
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.answer == PROCESSING_ERROR_ANSWER
    }
}
