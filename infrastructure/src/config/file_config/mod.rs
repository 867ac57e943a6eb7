//! Raw TOML configuration data types
//!
//! These structs mirror the config file one-to-one. Every section is
//! optional; missing keys fall back to the `Default` impls.

mod model;
mod orchestration;
mod server;
mod services;

pub use model::FileModelConfig;
pub use orchestration::{FileOrchestrationConfig, FileStreamingConfig};
pub use server::{FileLoggingConfig, FileServerConfig};
pub use services::{
    FileDataDictionaryConfig, FilePromptsConfig, FileQueryConfig, FileSearchConfig,
    FileStoreConfig, StoreBackend,
};

use orc_application::ExecutionParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("model.endpoint cannot be empty")]
    EmptyEndpoint,

    #[error("model.timeout_secs cannot be 0")]
    InvalidTimeout,

    #[error("orchestration.history_window cannot be 0")]
    InvalidHistoryWindow,

    #[error("orchestration.terminate_marker cannot be blank")]
    EmptyTerminateMarker,

    #[error("streaming.heartbeat_secs cannot be 0")]
    InvalidHeartbeat,

    #[error("store.path is required for the file backend")]
    MissingStorePath,

    #[error("server.bind is not a socket address: {0}")]
    InvalidBind(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Chat-completion endpoint
    pub model: FileModelConfig,
    /// Group chat loop settings
    pub orchestration: FileOrchestrationConfig,
    pub streaming: FileStreamingConfig,
    /// Conversation persistence
    pub store: FileStoreConfig,
    /// Document index used by the retrieval tools
    pub search: FileSearchConfig,
    /// Read-only query endpoint used by the SQL and DAX tools
    pub query: FileQueryConfig,
    pub prompts: FilePromptsConfig,
    pub data_dictionary: FileDataDictionaryConfig,
    pub server: FileServerConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.model.endpoint.trim().is_empty() {
            return Err(ConfigValidationError::EmptyEndpoint);
        }
        if self.model.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if self.orchestration.history_window == 0 {
            return Err(ConfigValidationError::InvalidHistoryWindow);
        }
        if self.orchestration.terminate_marker.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTerminateMarker);
        }
        if self.streaming.heartbeat_secs == 0 {
            return Err(ConfigValidationError::InvalidHeartbeat);
        }
        if self.store.backend == StoreBackend::File && self.store.path.is_none() {
            return Err(ConfigValidationError::MissingStorePath);
        }
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigValidationError::InvalidBind(self.server.bind.clone()));
        }
        Ok(())
    }

    /// Loop parameters for the group chat engine and streaming adapter.
    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_history_window(self.orchestration.history_window)
            .with_max_tool_iterations(self.orchestration.max_tool_iterations)
            .with_max_rounds(self.orchestration.max_rounds)
            .with_terminate_marker(self.orchestration.terminate_marker.trim())
            .with_stream_all_agents(self.streaming.stream_all_agents)
            .with_heartbeat_interval(Duration::from_secs(self.streaming.heartbeat_secs))
    }
}
