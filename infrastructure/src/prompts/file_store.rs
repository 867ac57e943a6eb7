//! Prompt templates read from a directory tree
//!
//! ```text
//! prompts/
//! ├── common/                       # shared snippets, one per placeholder
//! │   └── answer_rules.txt
//! └── classic_rag/
//!     ├── assistant.txt
//!     ├── assistant.custom.txt      # overrides assistant.txt when present
//!     └── chat_closure.txt
//! ```

use async_trait::async_trait;
use orc_application::{TemplateError, TemplateStore};
use orc_domain::PromptTemplate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const COMMON_DIR: &str = "common";

pub struct FileTemplateStore {
    root: PathBuf,
}

impl FileTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<agent>.custom.txt` first, then `<agent>.txt`.
    fn candidates(&self, strategy: &str, agent: &str) -> [PathBuf; 2] {
        let dir = self.root.join(strategy);
        [
            dir.join(format!("{}.custom.txt", agent)),
            dir.join(format!("{}.txt", agent)),
        ]
    }
}

/// Read a file, treating "missing" as `None` and anything else as an error.
async fn read_optional(path: &Path) -> Result<Option<String>, TemplateError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TemplateError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn load(
        &self,
        strategy: &str,
        agent: &str,
        placeholders: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        let mut source = None;
        for path in self.candidates(strategy, agent) {
            if let Some(text) = read_optional(&path).await? {
                debug!(strategy, agent, path = %path.display(), "Prompt loaded");
                source = Some(text);
                break;
            }
        }
        let Some(text) = source else {
            return Err(TemplateError::NotFound {
                strategy: strategy.to_string(),
                agent: agent.to_string(),
            });
        };

        let mut template = PromptTemplate::new(text).fill(placeholders);

        let mut shared = HashMap::new();
        for name in template.unresolved() {
            let path = self.root.join(COMMON_DIR).join(format!("{}.txt", name));
            if let Some(snippet) = read_optional(&path).await? {
                shared.insert(name, snippet.trim().to_string());
            }
        }
        if !shared.is_empty() {
            template = template.fill(&shared);
        }

        let leftover = template.unresolved();
        if !leftover.is_empty() {
            warn!(strategy, agent, placeholders = ?leftover, "Prompt has unresolved placeholders");
        }
        Ok(template.into_string())
    }
}
