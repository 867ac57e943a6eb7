//! Group chat settings (`[orchestration]` and `[streaming]` sections)

use orc_domain::DEFAULT_TERMINATE_MARKER;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestrationConfig {
    /// Strategy used for every request (`classic_rag`, `nl2sql`, ...)
    pub strategy: String,
    /// Trailing transcript messages sent to each agent
    pub history_window: usize,
    pub max_tool_iterations: usize,
    /// Overrides the strategy's own round cap
    pub max_rounds: Option<usize>,
    pub terminate_marker: String,
}

impl Default for FileOrchestrationConfig {
    fn default() -> Self {
        Self {
            strategy: "classic_rag".to_string(),
            history_window: 10,
            max_tool_iterations: 5,
            max_rounds: None,
            terminate_marker: DEFAULT_TERMINATE_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStreamingConfig {
    /// Idle seconds before a heartbeat frame
    pub heartbeat_secs: u64,
    /// Forward every agent's output instead of only the closing agent's
    pub stream_all_agents: bool,
}

impl Default for FileStreamingConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 15,
            stream_all_agents: false,
        }
    }
}
