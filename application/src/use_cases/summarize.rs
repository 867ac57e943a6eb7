//! Conversation summary use case.
//!
//! Prior history is not replayed to the agents; instead it is condensed
//! into a short summary that is baked into every agent prompt.

use crate::ports::llm_gateway::{LlmGateway, ModelRequest};
use orc_domain::{CONVERSATION_JUST_STARTED, Conversation, ModelParams, SummaryPrompt};
use orc_domain::util::{short_id, truncate_str};
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest raw history kept when the summary call fails.
const FALLBACK_HISTORY_CHARS: usize = 2000;

#[derive(Clone)]
pub struct SummarizeHistoryUseCase {
    gateway: Arc<dyn LlmGateway>,
    params: ModelParams,
}

impl SummarizeHistoryUseCase {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            gateway,
            params: ModelParams::default().with_temperature(0.0),
        }
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Summarize `conversation`'s history.
    ///
    /// Never fails: an empty history yields the fixed "just started" text, a
    /// failed model call yields the raw (truncated) history.
    pub async fn execute(&self, conversation: &Conversation) -> String {
        if conversation.is_empty() {
            return CONVERSATION_JUST_STARTED.to_string();
        }

        let history = conversation.history_as_text();
        let request = ModelRequest::new(SummaryPrompt::system())
            .with_user_message(SummaryPrompt::user(&history))
            .with_params(self.params.clone());

        match self.gateway.send(request).await {
            Ok(response) => {
                let summary = response.text_content().trim().to_string();
                debug!(
                    conversation = %short_id(&conversation.id),
                    chars = summary.len(),
                    "Summarized history"
                );
                if summary.is_empty() {
                    truncate_str(&history, FALLBACK_HISTORY_CHARS).to_string()
                } else {
                    summary
                }
            }
            Err(e) => {
                warn!(
                    conversation = %short_id(&conversation.id),
                    error = %e,
                    "History summary failed, using raw history"
                );
                truncate_str(&history, FALLBACK_HISTORY_CHARS).to_string()
            }
        }
    }
}
