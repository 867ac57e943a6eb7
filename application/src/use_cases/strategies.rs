//! Strategy registry.
//!
//! A strategy name maps to a blueprint function describing its team: agent
//! names, kinds, tools and the speaker selector. Building a strategy loads
//! every agent's prompt through the [`TemplateStore`] and validates the
//! result into a [`StrategyConfig`], so configuration mistakes surface
//! before any model call.

use crate::config::ExecutionParams;
use crate::ports::template_store::{TemplateError, TemplateStore};
use orc_domain::tool::names::{
    EXECUTE_DAX_QUERY, EXECUTE_SQL_QUERY, GET_ALL_DATASOURCES_INFO, GET_ALL_TABLES_INFO,
    GET_SCHEMA_INFO, GET_TIME, GET_TODAY_DATE, MULTIMODAL_VECTOR_INDEX_RETRIEVE,
    QUERIES_RETRIEVAL, VALIDATE_SQL_QUERY, VECTOR_INDEX_RETRIEVE,
};
use orc_domain::{
    AgentDefinition, AgentKind, AllowListSelector, DomainError, ModelParams, ResponseContract,
    RoutingSelector, SpeakerSelector, StrategyConfig, StrategyKind, TerminationCondition,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Placeholder filled with the conversation summary in every prompt.
pub const CONVERSATION_SUMMARY_PLACEHOLDER: &str = "conversation_summary";

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Template(TemplateError),
}

impl From<TemplateError> for StrategyError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound { strategy, agent } => {
                StrategyError::Domain(DomainError::MissingPrompt { strategy, agent })
            }
            other => StrategyError::Template(other),
        }
    }
}

/// One agent slot of a blueprint; its prompt is loaded at build time.
#[derive(Debug, Clone)]
pub struct AgentBlueprint {
    pub name: &'static str,
    pub kind: AgentKind,
    pub description: &'static str,
    pub tools: Vec<&'static str>,
    pub response_contract: Option<ResponseContract>,
}

impl AgentBlueprint {
    pub fn new(name: &'static str, kind: AgentKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            tools: Vec::new(),
            response_contract: None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn tools(mut self, tools: &[&'static str]) -> Self {
        self.tools = tools.to_vec();
        self
    }

    pub fn contract(mut self, contract: ResponseContract) -> Self {
        self.response_contract = Some(contract);
        self
    }
}

/// Team layout of a strategy, before prompts are attached.
#[derive(Debug, Clone)]
pub struct StrategyBlueprint {
    pub name: String,
    pub agents: Vec<AgentBlueprint>,
    pub selector: SpeakerSelector,
    pub closing_agent: &'static str,
    pub max_rounds: usize,
}

impl StrategyBlueprint {
    /// Contract the closing agent answers under.
    pub fn closing_contract(&self) -> Option<ResponseContract> {
        self.agents
            .iter()
            .find(|slot| slot.name == self.closing_agent)
            .map(|slot| {
                slot.response_contract
                    .unwrap_or_else(|| slot.kind.default_contract())
            })
    }
}

pub type BlueprintFn = fn() -> StrategyBlueprint;

/// Name → blueprint lookup plus prompt loading.
#[derive(Clone)]
pub struct StrategyRegistry {
    templates: Arc<dyn TemplateStore>,
    blueprints: HashMap<String, BlueprintFn>,
    model: ModelParams,
}

impl StrategyRegistry {
    /// Registry with the built-in strategies.
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        let mut registry = Self {
            templates,
            blueprints: HashMap::new(),
            model: ModelParams::default(),
        };
        registry.register(StrategyKind::ClassicRag.as_str(), classic_rag);
        registry.register(StrategyKind::MultimodalRag.as_str(), multimodal_rag);
        registry.register(StrategyKind::Nl2Sql.as_str(), nl2sql);
        registry.register(StrategyKind::Nl2SqlFewshot.as_str(), nl2sql_fewshot);
        registry.register(StrategyKind::ChatWithFabric.as_str(), chat_with_fabric);
        registry
    }

    /// Model parameters given to every agent built by this registry.
    pub fn with_model_params(mut self, model: ModelParams) -> Self {
        self.model = model;
        self
    }

    /// Add or replace a strategy.
    pub fn register(&mut self, name: &str, blueprint: BlueprintFn) {
        self.blueprints
            .insert(StrategyKind::normalize(name), blueprint);
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blueprints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn blueprint(&self, name: &str) -> Result<StrategyBlueprint, DomainError> {
        let normalized = StrategyKind::normalize(name);
        self.blueprints
            .get(&normalized)
            .map(|f| f())
            .ok_or(DomainError::UnknownStrategy(normalized))
    }

    /// Load prompts for every agent of `name` and validate the team.
    pub async fn build(
        &self,
        name: &str,
        placeholders: &HashMap<String, String>,
        params: &ExecutionParams,
    ) -> Result<StrategyConfig, StrategyError> {
        let blueprint = self.blueprint(name)?;
        let max_rounds = params.max_rounds.unwrap_or(blueprint.max_rounds);

        let mut builder = StrategyConfig::builder(blueprint.name.clone(), blueprint.selector)
            .closing_agent(blueprint.closing_agent)
            .max_rounds(max_rounds)
            .termination(TerminationCondition::text_mention(
                params.terminate_marker.as_str(),
            ));

        for slot in blueprint.agents {
            let prompt = self
                .templates
                .load(&blueprint.name, slot.name, placeholders)
                .await?;
            let mut agent = AgentDefinition::new(slot.name, slot.kind, prompt)
                .with_description(slot.description)
                .with_tools(slot.tools)
                .with_model(self.model.clone());
            if let Some(contract) = slot.response_contract {
                agent = agent.with_response_contract(contract);
            }
            builder = builder.agent(agent);
        }

        let config = builder.build()?;
        debug!(
            strategy = %config.name(),
            agents = config.agents().len(),
            max_rounds = config.max_rounds(),
            "Strategy built"
        );
        Ok(config)
    }
}

// ==================== Built-in Blueprints ====================

const CHAT_CLOSURE: &str = "chat_closure";

fn closure() -> AgentBlueprint {
    AgentBlueprint::new(CHAT_CLOSURE, AgentKind::Closing)
        .describe("Writes the final answer for the user.")
}

fn classic_rag() -> StrategyBlueprint {
    StrategyBlueprint {
        name: StrategyKind::ClassicRag.as_str().to_string(),
        agents: vec![
            AgentBlueprint::new("assistant", AgentKind::Retrieval)
                .describe("Answers from the document index.")
                .tools(&[VECTOR_INDEX_RETRIEVE, GET_TODAY_DATE, GET_TIME]),
            closure(),
        ],
        selector: RoutingSelector::new("assistant", CHAT_CLOSURE).into(),
        closing_agent: CHAT_CLOSURE,
        max_rounds: StrategyKind::ClassicRag.default_max_rounds(),
    }
}

/// A single assistant that both retrieves and answers.
fn multimodal_rag() -> StrategyBlueprint {
    StrategyBlueprint {
        name: StrategyKind::MultimodalRag.as_str().to_string(),
        agents: vec![
            AgentBlueprint::new("assistant", AgentKind::Closing)
                .describe("Answers from text and image search results.")
                .tools(&[MULTIMODAL_VECTOR_INDEX_RETRIEVE, GET_TODAY_DATE, GET_TIME])
                .contract(ResponseContract::PlainText),
        ],
        selector: AllowListSelector::new()
            .allow("user", "assistant")
            .allow("assistant", "user")
            .into(),
        closing_agent: "assistant",
        max_rounds: StrategyKind::MultimodalRag.default_max_rounds(),
    }
}

const SQL_TOOLS: [&str; 6] = [
    GET_SCHEMA_INFO,
    VALIDATE_SQL_QUERY,
    GET_ALL_TABLES_INFO,
    EXECUTE_SQL_QUERY,
    GET_TODAY_DATE,
    GET_TIME,
];

fn nl2sql() -> StrategyBlueprint {
    StrategyBlueprint {
        name: StrategyKind::Nl2Sql.as_str().to_string(),
        agents: vec![
            AgentBlueprint::new("assistant", AgentKind::Sql)
                .describe("Writes and runs read-only SQL.")
                .tools(&SQL_TOOLS),
            closure(),
        ],
        selector: RoutingSelector::new("assistant", CHAT_CLOSURE).into(),
        closing_agent: CHAT_CLOSURE,
        max_rounds: StrategyKind::Nl2Sql.default_max_rounds(),
    }
}

fn nl2sql_fewshot() -> StrategyBlueprint {
    let mut blueprint = nl2sql();
    blueprint.name = StrategyKind::Nl2SqlFewshot.as_str().to_string();
    blueprint.max_rounds = StrategyKind::Nl2SqlFewshot.default_max_rounds();
    if let Some(assistant) = blueprint.agents.first_mut() {
        assistant.tools.insert(2, QUERIES_RETRIEVAL);
        assistant.description = "Writes and runs read-only SQL, guided by example queries.";
    }
    blueprint
}

/// Triage picks a datasource, then hands off with `DATASOURCE_SELECTED:<kind>`.
fn chat_with_fabric() -> StrategyBlueprint {
    StrategyBlueprint {
        name: StrategyKind::ChatWithFabric.as_str().to_string(),
        agents: vec![
            AgentBlueprint::new("triage_agent", AgentKind::Custom)
                .describe("Chooses the datasource that can answer the question.")
                .tools(&[GET_ALL_DATASOURCES_INFO, GET_TODAY_DATE, GET_TIME]),
            AgentBlueprint::new("dax_query_agent", AgentKind::Sql)
                .describe("Queries semantic models with DAX.")
                .tools(&[
                    QUERIES_RETRIEVAL,
                    GET_ALL_TABLES_INFO,
                    GET_SCHEMA_INFO,
                    EXECUTE_DAX_QUERY,
                    GET_TODAY_DATE,
                    GET_TIME,
                ]),
            closure(),
        ],
        selector: RoutingSelector::new("triage_agent", CHAT_CLOSURE)
            .with_route("semantic_model", "dax_query_agent")
            .with_route("dax", "dax_query_agent")
            .into(),
        closing_agent: CHAT_CLOSURE,
        max_rounds: StrategyKind::ChatWithFabric.default_max_rounds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orc_domain::{NextSpeaker, Transcript, TurnSelector};

    /// Returns `<strategy>/<agent>: <summary>` for every agent.
    struct EchoTemplates;

    #[async_trait]
    impl TemplateStore for EchoTemplates {
        async fn load(
            &self,
            strategy: &str,
            agent: &str,
            placeholders: &HashMap<String, String>,
        ) -> Result<String, TemplateError> {
            let summary = placeholders
                .get(CONVERSATION_SUMMARY_PLACEHOLDER)
                .cloned()
                .unwrap_or_default();
            Ok(format!("{strategy}/{agent}: {summary}"))
        }
    }

    struct NoTemplates;

    #[async_trait]
    impl TemplateStore for NoTemplates {
        async fn load(
            &self,
            strategy: &str,
            agent: &str,
            _placeholders: &HashMap<String, String>,
        ) -> Result<String, TemplateError> {
            Err(TemplateError::NotFound {
                strategy: strategy.to_string(),
                agent: agent.to_string(),
            })
        }
    }

    fn registry() -> StrategyRegistry {
        StrategyRegistry::new(Arc::new(EchoTemplates))
    }

    fn summary(text: &str) -> HashMap<String, String> {
        HashMap::from([(CONVERSATION_SUMMARY_PLACEHOLDER.to_string(), text.to_string())])
    }

    #[tokio::test]
    async fn test_every_builtin_strategy_builds() {
        let registry = registry();
        for kind in StrategyKind::ALL {
            let config = registry
                .build(kind.as_str(), &summary("s"), &ExecutionParams::default())
                .await
                .unwrap();
            assert_eq!(config.max_rounds(), kind.default_max_rounds());
            assert!(config.agent(config.closing_agent()).is_some());
        }
    }

    #[tokio::test]
    async fn test_first_speaker_per_strategy() {
        let registry = registry();
        let expected = [
            (StrategyKind::ClassicRag, "assistant"),
            (StrategyKind::MultimodalRag, "assistant"),
            (StrategyKind::Nl2Sql, "assistant"),
            (StrategyKind::Nl2SqlFewshot, "assistant"),
            (StrategyKind::ChatWithFabric, "triage_agent"),
        ];
        for (kind, first) in expected {
            let config = registry
                .build(kind.as_str(), &summary(""), &ExecutionParams::default())
                .await
                .unwrap();
            let next = config.selector().select(&Transcript::with_ask("hi"));
            assert_eq!(next, NextSpeaker::Agent(first.to_string()), "{kind}");
        }
    }

    #[tokio::test]
    async fn test_prompts_receive_summary() {
        let config = registry()
            .build("classic-rag", &summary("talked about cats"), &ExecutionParams::default())
            .await
            .unwrap();
        let assistant = config.agent("assistant").unwrap();
        assert_eq!(assistant.system_prompt, "classic_rag/assistant: talked about cats");
        assert!(assistant.has_tool(VECTOR_INDEX_RETRIEVE));
    }

    #[tokio::test]
    async fn test_fewshot_adds_queries_retrieval() {
        let config = registry()
            .build("nl2sql_fewshot", &summary(""), &ExecutionParams::default())
            .await
            .unwrap();
        let assistant = config.agent("assistant").unwrap();
        assert!(assistant.has_tool(QUERIES_RETRIEVAL));
        assert!(assistant.has_tool(EXECUTE_SQL_QUERY));
    }

    #[tokio::test]
    async fn test_unknown_strategy() {
        let err = registry()
            .build("telepathy", &summary(""), &ExecutionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Domain(DomainError::UnknownStrategy(ref name)) if name == "telepathy"
        ));
    }

    #[tokio::test]
    async fn test_missing_prompt_is_domain_error() {
        let registry = StrategyRegistry::new(Arc::new(NoTemplates));
        let err = registry
            .build("nl2sql", &summary(""), &ExecutionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Domain(DomainError::MissingPrompt { ref agent, .. }) if agent == "assistant"
        ));
    }

    #[tokio::test]
    async fn test_round_override_and_marker() {
        let params = ExecutionParams::default()
            .with_max_rounds(Some(3))
            .with_terminate_marker("DONE");
        let config = registry().build("nl2sql", &summary(""), &params).await.unwrap();
        assert_eq!(config.max_rounds(), 3);
        assert_eq!(config.termination().keyword(), Some("DONE"));
        // Only the round cap bounds the exchange; tool traffic is not counted
        assert_eq!(config.termination().max_messages(), None);
    }

    #[tokio::test]
    async fn test_model_params_reach_every_agent() {
        let config = registry()
            .with_model_params(ModelParams::default().with_temperature(0.2).with_deployment("gpt-x"))
            .build("chat_with_fabric", &summary(""), &ExecutionParams::default())
            .await
            .unwrap();
        for agent in config.agents() {
            assert_eq!(agent.model.deployment.as_deref(), Some("gpt-x"));
            assert_eq!(agent.model.temperature, 0.2);
        }
    }

    #[test]
    fn test_closing_contracts() {
        let registry = registry();
        let contract = |name: &str| registry.blueprint(name).unwrap().closing_contract();
        assert_eq!(contract("classic_rag"), Some(ResponseContract::JsonAnswer));
        assert_eq!(contract("multimodal_rag"), Some(ResponseContract::PlainText));
        assert_eq!(contract("chat_with_fabric"), Some(ResponseContract::JsonAnswer));
    }

    #[test]
    fn test_register_custom() {
        fn solo() -> StrategyBlueprint {
            StrategyBlueprint {
                name: "solo".to_string(),
                agents: vec![AgentBlueprint::new("only", AgentKind::Closing)],
                selector: AllowListSelector::new().allow("user", "only").into(),
                closing_agent: "only",
                max_rounds: 2,
            }
        }
        let mut registry = registry();
        registry.register("Solo", solo);
        assert!(registry.names().contains(&"solo"));
        assert_eq!(registry.blueprint("SOLO").unwrap().max_rounds, 2);
    }
}
