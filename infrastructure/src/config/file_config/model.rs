//! Model endpoint configuration (`[model]` section)

use orc_domain::ModelParams;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible chat-completion endpoint.
///
/// When `api_version` is set the endpoint is addressed Azure-style
/// (`<endpoint>/openai/deployments/<deployment>/chat/completions?api-version=...`
/// with an `api-key` header); otherwise `<endpoint>/chat/completions` with
/// a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    pub endpoint: String,
    /// Direct API key (prefer `api_key_env`).
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Default model / deployment name.
    pub deployment: String,
    pub api_version: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Retries for 429, 5xx and transport errors.
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            deployment: "gpt-4o".to_string(),
            api_version: None,
            temperature: 0.7,
            max_tokens: 1500,
            max_retries: 5,
            timeout_secs: 120,
        }
    }
}

impl FileModelConfig {
    /// Explicit key first, then the environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Sampling parameters handed to every agent.
    pub fn model_params(&self) -> ModelParams {
        ModelParams::default()
            .with_deployment(self.deployment.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_wins() {
        let config = FileModelConfig {
            api_key: Some("sk-direct".to_string()),
            api_key_env: "ORC_TEST_MODEL_KEY_UNSET".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-direct"));
    }

    #[test]
    fn test_blank_key_falls_through() {
        let config = FileModelConfig {
            api_key: Some("  ".to_string()),
            api_key_env: "ORC_TEST_MODEL_KEY_UNSET".to_string(),
            ..Default::default()
        };
        assert!(config.resolve_api_key().is_none());
    }

    #[test]
    fn test_model_params() {
        let params = FileModelConfig::default().model_params();
        assert_eq!(params.deployment.as_deref(), Some("gpt-4o"));
        assert_eq!(params.max_tokens, 1500);
    }
}
