//! Termination conditions

use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;

/// Marker the closing agent appends to signal the end of the exchange.
pub const DEFAULT_TERMINATE_MARKER: &str = "TERMINATE";

/// Why an exchange stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    KeywordMentioned,
    MaxMessages,
}

/// Keyword mention OR message count.
///
/// Evaluated after every append. Both predicates only look at what the
/// transcript already contains, so once the condition holds it keeps
/// holding as the transcript grows. The user's own ask never triggers the
/// keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationCondition {
    keyword: Option<String>,
    max_messages: Option<usize>,
}

impl TerminationCondition {
    /// A condition that never fires on its own.
    pub fn never() -> Self {
        Self {
            keyword: None,
            max_messages: None,
        }
    }

    pub fn text_mention(keyword: impl Into<String>) -> Self {
        Self::never().with_keyword(keyword)
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.keyword = if keyword.trim().is_empty() {
            None
        } else {
            Some(keyword)
        };
        self
    }

    /// Fire once the transcript holds `max_messages` entries of any kind,
    /// tool requests and results included. The engine's round cap is the
    /// separate limit on agent messages.
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = Some(max_messages);
        self
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn max_messages(&self) -> Option<usize> {
        self.max_messages
    }

    pub fn reason(&self, transcript: &Transcript) -> Option<TerminationReason> {
        if let Some(keyword) = &self.keyword {
            let mentioned = transcript
                .iter()
                .filter(|m| !m.is_from_user())
                .filter_map(|m| m.as_text())
                .any(|text| text.contains(keyword.as_str()));
            if mentioned {
                return Some(TerminationReason::KeywordMentioned);
            }
        }
        match self.max_messages {
            Some(max) if transcript.len() >= max => Some(TerminationReason::MaxMessages),
            _ => None,
        }
    }

    pub fn is_met(&self, transcript: &Transcript) -> bool {
        self.reason(transcript).is_some()
    }
}

impl Default for TerminationCondition {
    fn default() -> Self {
        Self::text_mention(DEFAULT_TERMINATE_MARKER)
    }
}
