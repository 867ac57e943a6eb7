//! Per-agent model parameters.

use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every call an agent makes.
///
/// `deployment` overrides the endpoint's default model when set.
///
/// ```
/// use orc_domain::agent::ModelParams;
///
/// let params = ModelParams::default().with_temperature(0.0).with_max_tokens(800);
/// assert_eq!(params.max_tokens, 800);
/// assert!(params.deployment.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            deployment: None,
            temperature: 0.7,
            max_tokens: 1500,
        }
    }
}

impl ModelParams {
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
