//! Template store port
//!
//! Resolves the system prompt for an agent of a strategy.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("No prompt for agent '{agent}' in strategy '{strategy}'")]
    NotFound { strategy: String, agent: String },

    #[error("Failed to read prompt {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Loads prompt templates and fills `{{placeholder}}` markers.
///
/// Placeholders not present in `placeholders` are resolved from shared
/// snippets when the store has one of that name; anything left over stays
/// in the text and is logged.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn load(
        &self,
        strategy: &str,
        agent: &str,
        placeholders: &HashMap<String, String>,
    ) -> Result<String, TemplateError>;
}
