//! Strategy catalogue

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Known agent strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Retrieval assistant grounded on the document index
    #[default]
    ClassicRag,
    /// Retrieval over text and images
    MultimodalRag,
    /// Natural language to SQL
    Nl2Sql,
    /// Natural language to SQL with retrieved example queries
    Nl2SqlFewshot,
    /// Triage across semantic models and databases
    ChatWithFabric,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::ClassicRag,
        StrategyKind::MultimodalRag,
        StrategyKind::Nl2Sql,
        StrategyKind::Nl2SqlFewshot,
        StrategyKind::ChatWithFabric,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::ClassicRag => "classic_rag",
            StrategyKind::MultimodalRag => "multimodal_rag",
            StrategyKind::Nl2Sql => "nl2sql",
            StrategyKind::Nl2SqlFewshot => "nl2sql_fewshot",
            StrategyKind::ChatWithFabric => "chat_with_fabric",
        }
    }

    /// Hard cap on agent messages for one request
    pub fn default_max_rounds(&self) -> usize {
        match self {
            StrategyKind::ClassicRag | StrategyKind::MultimodalRag => 8,
            StrategyKind::Nl2Sql | StrategyKind::Nl2SqlFewshot | StrategyKind::ChatWithFabric => 20,
        }
    }

    /// Strategy names are matched case-insensitively with `-` and `_` interchangeable.
    pub fn normalize(name: &str) -> String {
        name.trim().to_lowercase().replace('-', "_")
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = Self::normalize(s);
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownStrategy(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_dashes_and_case() {
        assert_eq!("classic-rag".parse::<StrategyKind>().unwrap(), StrategyKind::ClassicRag);
        assert_eq!(" NL2SQL_FEWSHOT ".parse::<StrategyKind>().unwrap(), StrategyKind::Nl2SqlFewshot);
        assert_eq!("chat-with-fabric".parse::<StrategyKind>().unwrap(), StrategyKind::ChatWithFabric);
    }

    #[test]
    fn unknown_strategy_is_error() {
        let err = "nl2sql_dual".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err, DomainError::UnknownStrategy("nl2sql_dual".into()));
    }

    #[test]
    fn names_round_trip() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn round_caps() {
        assert_eq!(StrategyKind::ClassicRag.default_max_rounds(), 8);
        assert_eq!(StrategyKind::Nl2Sql.default_max_rounds(), 20);
        assert_eq!(StrategyKind::ChatWithFabric.default_max_rounds(), 20);
    }
}
