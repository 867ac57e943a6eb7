//! Execution parameters for the use case loops.
//!
//! [`ExecutionParams`] groups the static parameters that control the group
//! chat loop in [`GroupChatEngine`](crate::use_cases::group_chat::GroupChatEngine)
//! and the streaming adapter. These are application-layer concerns, not
//! domain policy: strategies own their round caps, these tune the runtime.

use orc_domain::DEFAULT_TERMINATE_MARKER;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Trailing transcript messages sent to the model on each agent turn.
    pub history_window: usize,
    /// Tool round trips one agent may make before its turn is cut off.
    pub max_tool_iterations: usize,
    /// Overrides the strategy's round cap when set.
    pub max_rounds: Option<usize>,
    /// Idle time after which the streaming adapter emits a heartbeat.
    pub heartbeat_interval: Duration,
    /// Text that ends the exchange when an agent says it.
    pub terminate_marker: String,
    /// Forward every agent's partial output, not just the closing agent's.
    pub stream_all_agents: bool,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            history_window: 10,
            max_tool_iterations: 5,
            max_rounds: None,
            heartbeat_interval: Duration::from_secs(15),
            terminate_marker: DEFAULT_TERMINATE_MARKER.to_string(),
            stream_all_agents: false,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn with_max_rounds(mut self, max: Option<usize>) -> Self {
        self.max_rounds = max.filter(|m| *m > 0);
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_terminate_marker(mut self, marker: impl Into<String>) -> Self {
        self.terminate_marker = marker.into();
        self
    }

    pub fn with_stream_all_agents(mut self, all: bool) -> Self {
        self.stream_all_agents = all;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ExecutionParams::default();
        assert_eq!(params.history_window, 10);
        assert_eq!(params.max_tool_iterations, 5);
        assert_eq!(params.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(params.terminate_marker, "TERMINATE");
        assert!(params.max_rounds.is_none());
        assert!(!params.stream_all_agents);
    }

    #[test]
    fn test_builder() {
        let params = ExecutionParams::default()
            .with_history_window(0)
            .with_max_rounds(Some(0))
            .with_heartbeat_interval(Duration::from_secs(1));

        assert_eq!(params.history_window, 1);
        assert!(params.max_rounds.is_none());
        assert_eq!(params.heartbeat_interval, Duration::from_secs(1));
    }
}
