//! Configuration file loading for orc
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ORC_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./orc.toml` or `./.orc.toml`
//! 4. Global: `~/.config/orc/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileDataDictionaryConfig, FileLoggingConfig,
    FileModelConfig, FileOrchestrationConfig, FilePromptsConfig, FileQueryConfig,
    FileSearchConfig, FileServerConfig, FileStoreConfig, FileStreamingConfig, StoreBackend,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
