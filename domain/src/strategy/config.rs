//! Strategy configuration
//!
//! A [`StrategyConfig`] can only be obtained through
//! [`StrategyConfigBuilder::build`], which rejects teams that could never
//! run to completion: duplicate names, a missing closing agent, selector
//! targets that are not defined, and agents no transition ever reaches.

use serde::Serialize;

use super::selection::{NextSpeaker, SpeakerSelector, TurnSelector};
use super::termination::TerminationCondition;
use crate::agent::AgentDefinition;
use crate::core::error::DomainError;
use crate::transcript::USER_SPEAKER;

/// Default hard cap on agent messages per request.
pub const DEFAULT_MAX_ROUNDS: usize = 8;

/// A validated team of agents and the rules of their exchange.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyConfig {
    name: String,
    agents: Vec<AgentDefinition>,
    selector: SpeakerSelector,
    closing_agent: String,
    termination: TerminationCondition,
    max_rounds: usize,
}

impl StrategyConfig {
    pub fn builder(name: impl Into<String>, selector: impl Into<SpeakerSelector>) -> StrategyConfigBuilder {
        StrategyConfigBuilder {
            name: name.into(),
            agents: Vec::new(),
            selector: selector.into(),
            closing_agent: None,
            termination: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agents(&self) -> &[AgentDefinition] {
        &self.agents
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn closing_agent(&self) -> &str {
        &self.closing_agent
    }

    pub fn selector(&self) -> &SpeakerSelector {
        &self.selector
    }

    pub fn termination(&self) -> &TerminationCondition {
        &self.termination
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Map a selector decision to a concrete agent.
    ///
    /// `Ok(None)` means the exchange should stop.
    pub fn resolve(&self, next: &NextSpeaker) -> Result<Option<&AgentDefinition>, DomainError> {
        let name = match next {
            NextSpeaker::Terminate => return Ok(None),
            NextSpeaker::Closing => self.closing_agent.as_str(),
            NextSpeaker::Agent(name) => name.as_str(),
        };
        self.agent(name)
            .map(Some)
            .ok_or_else(|| DomainError::UnknownAgent(name.to_string()))
    }

    /// Every distinct tool name used by any agent.
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for agent in &self.agents {
            for tool in &agent.tools {
                if !names.contains(&tool.as_str()) {
                    names.push(tool);
                }
            }
        }
        names
    }
}

/// Builder for [`StrategyConfig`]
#[derive(Debug, Clone)]
pub struct StrategyConfigBuilder {
    name: String,
    agents: Vec<AgentDefinition>,
    selector: SpeakerSelector,
    closing_agent: Option<String>,
    termination: Option<TerminationCondition>,
    max_rounds: usize,
}

impl StrategyConfigBuilder {
    pub fn agent(mut self, agent: AgentDefinition) -> Self {
        self.agents.push(agent);
        self
    }

    /// Defaults to the first agent of kind `Closing`.
    pub fn closing_agent(mut self, name: impl Into<String>) -> Self {
        self.closing_agent = Some(name.into());
        self
    }

    /// Defaults to `TERMINATE` mention or `max_rounds` messages.
    pub fn termination(mut self, termination: TerminationCondition) -> Self {
        self.termination = Some(termination);
        self
    }

    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn build(self) -> Result<StrategyConfig, DomainError> {
        if self.agents.is_empty() {
            return Err(DomainError::InvalidStrategy(format!(
                "strategy '{}' has no agents",
                self.name
            )));
        }
        if self.max_rounds == 0 {
            return Err(DomainError::InvalidStrategy(format!(
                "strategy '{}' must allow at least one round",
                self.name
            )));
        }

        for (i, agent) in self.agents.iter().enumerate() {
            if agent.name == USER_SPEAKER {
                return Err(DomainError::InvalidStrategy(format!(
                    "'{}' is reserved for the asking user",
                    USER_SPEAKER
                )));
            }
            if self.agents[..i].iter().any(|a| a.name == agent.name) {
                return Err(DomainError::DuplicateAgent(agent.name.clone()));
            }
        }

        let closing_agent = match self.closing_agent {
            Some(name) => name,
            None => self
                .agents
                .iter()
                .find(|a| a.is_closing())
                .map(|a| a.name.clone())
                .ok_or_else(|| {
                    DomainError::InvalidStrategy(format!(
                        "strategy '{}' has no closing agent",
                        self.name
                    ))
                })?,
        };
        if !self.agents.iter().any(|a| a.name == closing_agent) {
            return Err(DomainError::UnknownAgent(closing_agent));
        }

        let reachable = self.selector.reachable_agents();
        if let Some(unknown) = reachable
            .iter()
            .find(|name| !self.agents.iter().any(|a| &a.name == *name))
        {
            return Err(DomainError::UnknownAgent(unknown.clone()));
        }
        if let Some(unreachable) = self
            .agents
            .iter()
            .find(|a| a.name != closing_agent && !reachable.contains(&a.name))
        {
            return Err(DomainError::UnreachableAgent(unreachable.name.clone()));
        }

        let termination = self.termination.unwrap_or_default();

        Ok(StrategyConfig {
            name: self.name,
            agents: self.agents,
            selector: self.selector,
            closing_agent,
            termination,
            max_rounds: self.max_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::strategy::selection::{AllowListSelector, RoutingSelector};

    fn assistant() -> AgentDefinition {
        AgentDefinition::new("main_assistant", AgentKind::Retrieval, "Answer from sources.")
            .with_tools(["vector_index_retrieve", "get_today_date"])
    }

    fn closure() -> AgentDefinition {
        AgentDefinition::new("chat_closure", AgentKind::Closing, "Close the chat.")
    }

    #[test]
    fn builds_valid_strategy_with_defaults() {
        let config = StrategyConfig::builder(
            "classic_rag",
            RoutingSelector::new("main_assistant", "chat_closure"),
        )
        .agent(assistant())
        .agent(closure())
        .build()
        .unwrap();

        assert_eq!(config.closing_agent(), "chat_closure");
        assert_eq!(config.max_rounds(), DEFAULT_MAX_ROUNDS);
        assert_eq!(config.termination().keyword(), Some("TERMINATE"));
        assert_eq!(config.termination().max_messages(), None);
        assert_eq!(config.tool_names(), vec!["vector_index_retrieve", "get_today_date"]);
    }

    #[test]
    fn resolve_maps_decisions() {
        let config = StrategyConfig::builder(
            "classic_rag",
            RoutingSelector::new("main_assistant", "chat_closure"),
        )
        .agent(assistant())
        .agent(closure())
        .build()
        .unwrap();

        assert_eq!(config.resolve(&NextSpeaker::Closing).unwrap().unwrap().name, "chat_closure");
        assert!(config.resolve(&NextSpeaker::Terminate).unwrap().is_none());
        assert_eq!(
            config.resolve(&NextSpeaker::Agent("ghost".into())).unwrap_err(),
            DomainError::UnknownAgent("ghost".into())
        );
    }

    #[test]
    fn duplicate_agents_rejected() {
        let err = StrategyConfig::builder("x", RoutingSelector::new("main_assistant", "chat_closure"))
            .agent(assistant())
            .agent(assistant())
            .agent(closure())
            .build()
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateAgent("main_assistant".into()));
    }

    #[test]
    fn unreachable_agent_rejected() {
        let advisor = AgentDefinition::new("advisor", AgentKind::Custom, "Review.");
        let err = StrategyConfig::builder("x", RoutingSelector::new("main_assistant", "chat_closure"))
            .agent(assistant())
            .agent(advisor)
            .agent(closure())
            .build()
            .unwrap_err();
        assert_eq!(err, DomainError::UnreachableAgent("advisor".into()));
    }

    #[test]
    fn selector_target_must_exist() {
        let err = StrategyConfig::builder("x", RoutingSelector::new("assistant", "chat_closure"))
            .agent(assistant())
            .agent(closure())
            .build()
            .unwrap_err();
        assert_eq!(err, DomainError::UnknownAgent("assistant".into()));
    }

    #[test]
    fn closing_agent_required() {
        let err = StrategyConfig::builder(
            "x",
            AllowListSelector::new().allow("user", "main_assistant"),
        )
        .agent(assistant())
        .build()
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStrategy(_)));
    }

    #[test]
    fn explicit_closing_agent_may_be_a_worker() {
        let mm = AgentDefinition::new("assistant", AgentKind::Retrieval, "p");
        let config = StrategyConfig::builder(
            "multimodal_rag",
            AllowListSelector::new().allow("user", "assistant").allow("assistant", "user"),
        )
        .agent(mm)
        .closing_agent("assistant")
        .max_rounds(3)
        .build()
        .unwrap();
        assert_eq!(config.closing_agent(), "assistant");
        assert_eq!(config.max_rounds(), 3);
    }

    #[test]
    fn zero_rounds_rejected() {
        let err = StrategyConfig::builder("x", RoutingSelector::new("main_assistant", "chat_closure"))
            .agent(assistant())
            .agent(closure())
            .max_rounds(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStrategy(_)));
    }
}
