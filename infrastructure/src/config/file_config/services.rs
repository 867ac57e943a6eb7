//! Backing services: store, search, query, prompts, data dictionary

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; conversations are lost on restart
    #[default]
    Memory,
    /// One JSON document per conversation under `path`
    File,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    pub backend: StoreBackend,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSearchConfig {
    /// Search service base URL; retrieval tools report "not configured" when unset
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    /// Document index
    pub index: String,
    /// Index holding few-shot example queries
    pub queries_index: String,
    pub top_k: usize,
}

impl Default for FileSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: "2024-07-01".to_string(),
            index: "ragindex".to_string(),
            queries_index: "queries".to_string(),
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQueryConfig {
    /// Query service base URL; query tools report "not configured" when unset
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePromptsConfig {
    /// Root of `<strategy>/<agent>.txt` prompt files
    pub dir: PathBuf,
}

impl Default for FilePromptsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("prompts"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDataDictionaryConfig {
    /// JSON document describing datasources and tables
    pub path: Option<PathBuf>,
}
