//! Conversation entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout used for `ConversationData::start_date`.
pub const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Author of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

impl HistoryRole {
    pub fn as_str(&self) -> &str {
        match self {
            HistoryRole::User => "user",
            HistoryRole::Assistant => "assistant",
        }
    }
}

/// One `(role, content)` pair of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            content: content.into(),
        }
    }
}

/// Record of a single answered request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub user_name: String,
    /// Wall-clock seconds spent answering, rounded to two decimals
    pub response_time: f64,
    pub answer: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub data_points: Vec<String>,
}

impl Interaction {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        response_time_secs: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            response_time: (response_time_secs * 100.0).round() / 100.0,
            answer: String::new(),
            reasoning: String::new(),
            data_points: Vec::new(),
        }
    }

    pub fn with_answer(
        mut self,
        answer: impl Into<String>,
        reasoning: impl Into<String>,
        data_points: Vec<String>,
    ) -> Self {
        self.answer = answer.into();
        self.reasoning = reasoning.into();
        self.data_points = data_points;
        self
    }
}

/// Bookkeeping stored alongside the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationData {
    pub start_date: String,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// A persisted conversation (Entity)
///
/// Read once at the start of a request and written once at the end;
/// nothing mutates it while the agents are talking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub conversation_data: ConversationData,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self::started_at(id, Utc::now())
    }

    pub fn started_at(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            history: Vec::new(),
            conversation_data: ConversationData {
                start_date: created_at.format(START_DATE_FORMAT).to_string(),
                interactions: Vec::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Fold one answered ask back into the record.
    pub fn record_exchange(
        &mut self,
        ask: impl Into<String>,
        answer: impl Into<String>,
        interaction: Interaction,
    ) {
        self.history.push(HistoryEntry::user(ask));
        self.history.push(HistoryEntry::assistant(answer));
        self.conversation_data.interactions.push(interaction);
    }

    /// History rendered as plain `role: content` lines, for summarization.
    pub fn history_as_text(&self) -> String {
        self.history
            .iter()
            .map(|entry| format!("{}: {}", entry.role.as_str(), entry.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
