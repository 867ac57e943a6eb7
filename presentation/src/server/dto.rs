//! Request and error bodies of the HTTP surface.

use orc_domain::{Credentials, Question};
use orc_domain::core::credentials::{ANONYMOUS_PRINCIPAL_ID, ANONYMOUS_PRINCIPAL_NAME};
use orc_application::AskRequest;
use serde::{Deserialize, Serialize};

/// Returned with 400 when the body carries no usable question.
pub const NO_QUESTION: &str = "no question found in json input";

/// Group names arrive either as a JSON list or as one comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupNames {
    List(Vec<String>),
    Csv(String),
}

impl GroupNames {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            GroupNames::List(names) => names,
            GroupNames::Csv(text) => text.split(',').map(|g| g.trim().to_string()).collect(),
        }
    }
}

/// Body of `POST /orc` and `POST /orcstream`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AskBody {
    pub conversation_id: Option<String>,
    pub question: Option<String>,
    pub client_principal_id: Option<String>,
    pub client_principal_name: Option<String>,
    pub client_group_names: Option<GroupNames>,
    pub access_token: Option<String>,
    /// Strip markdown from streamed chunks; `null` means off
    pub optimize_for_audio: Option<bool>,
    /// Stream plain text as `text/event-stream` instead of JSON lines
    pub text_only: Option<bool>,
}

impl AskBody {
    /// Parse a raw body; `None` for invalid JSON.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    pub fn wants_audio(&self) -> bool {
        self.optimize_for_audio.unwrap_or(false)
    }

    pub fn wants_text_only(&self) -> bool {
        self.text_only.unwrap_or(false)
    }

    pub fn credentials(&self) -> Credentials {
        let id = self
            .client_principal_id
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_PRINCIPAL_ID.to_string());
        let name = self
            .client_principal_name
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_PRINCIPAL_NAME.to_string());
        let mut credentials = Credentials::new(id, name).with_groups(
            self.client_group_names
                .clone()
                .map(GroupNames::into_vec)
                .unwrap_or_default(),
        );
        if let Some(token) = self.access_token.clone().filter(|t| !t.is_empty()) {
            credentials = credentials.with_access_token(token);
        }
        credentials
    }

    /// The orchestrator request, or `None` when the question is missing or blank.
    pub fn into_request(self) -> Option<AskRequest> {
        let question = Question::try_new(self.question.as_deref()?)?;
        let credentials = self.credentials();
        Some(AskRequest::new(question, credentials).with_conversation_id(self.conversation_id))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn no_question() -> Self {
        Self {
            error: NO_QUESTION.to_string(),
        }
    }
}
