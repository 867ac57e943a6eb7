//! Agent definitions

use super::model_params::ModelParams;
use serde::{Deserialize, Serialize};

/// The closed set of agent roles.
///
/// Behaviour differences between roles are expressed through
/// [`AgentKind::default_contract`] and [`AgentKind::uses_tools`] rather than
/// one type per agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Answers from the document index.
    Retrieval,
    /// Translates questions into database or semantic-model queries.
    Sql,
    /// Produces the final answer of the exchange.
    Closing,
    /// Anything else (triage, advisors).
    Custom,
}

impl AgentKind {
    pub fn as_str(&self) -> &str {
        match self {
            AgentKind::Retrieval => "retrieval",
            AgentKind::Sql => "sql",
            AgentKind::Closing => "closing",
            AgentKind::Custom => "custom",
        }
    }

    pub fn default_contract(&self) -> ResponseContract {
        match self {
            AgentKind::Closing => ResponseContract::JsonAnswer,
            _ => ResponseContract::PlainText,
        }
    }

    pub fn uses_tools(&self) -> bool {
        !matches!(self, AgentKind::Closing)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape of the text an agent is expected to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseContract {
    PlainText,
    /// A JSON object with `answer` and `reasoning` fields
    JsonAnswer,
}

impl ResponseContract {
    pub fn requires_json(&self) -> bool {
        matches!(self, ResponseContract::JsonAnswer)
    }
}

/// One agent of a strategy (immutable once built)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique within its strategy
    pub name: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
    /// Names of registered tools this agent may call
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub model: ModelParams,
    pub response_contract: ResponseContract,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, kind: AgentKind, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            model: ModelParams::default(),
            response_contract: kind.default_contract(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        let tool = tool.into();
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }

    pub fn with_tools(self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        tools.into_iter().fold(self, |agent, tool| agent.with_tool(tool))
    }

    pub fn with_model(mut self, model: ModelParams) -> Self {
        self.model = model;
        self
    }

    pub fn with_response_contract(mut self, contract: ResponseContract) -> Self {
        self.response_contract = contract;
        self
    }

    pub fn is_closing(&self) -> bool {
        self.kind == AgentKind::Closing
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }
}
