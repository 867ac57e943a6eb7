//! Question value object

use serde::{Deserialize, Serialize};

/// The user's ask for one request (Value Object)
///
/// Always non-blank; the HTTP surface rejects blank questions before any
/// orchestration starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    content: String,
}

impl Question {
    /// Try to create a new question, returning None if blank
    pub fn try_new(content: impl Into<String>) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            None
        } else {
            Some(Self { content })
        }
    }

    /// Get the question content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume and return the inner content
    pub fn into_content(self) -> String {
        self.content
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

impl TryFrom<String> for Question {
    type Error = crate::DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Question::try_new(s).ok_or_else(|| {
            crate::DomainError::InvalidQuestion("question cannot be blank".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_empty() {
        assert!(Question::try_new("").is_none());
        assert!(Question::try_new("   ").is_none());
    }

    #[test]
    fn test_try_new_valid() {
        let q = Question::try_new("What is the refund policy?").unwrap();
        assert_eq!(q.content(), "What is the refund policy?");
    }

    #[test]
    fn test_try_from_blank_is_error() {
        let result = Question::try_from("\n".to_string());
        assert!(matches!(result, Err(crate::DomainError::InvalidQuestion(_))));
    }
}
