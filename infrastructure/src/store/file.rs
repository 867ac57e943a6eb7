use async_trait::async_trait;
use orc_application::{ConversationStore, ConversationStoreError};
use orc_domain::Conversation;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Conversations stored as `<dir>/<id>.json`.
///
/// Writes go to a temporary sibling and are renamed into place, so a reader
/// never sees a half-written record. Each write gets its own temporary file;
/// concurrent writers of one id resolve last-writer-wins.
pub struct FileConversationStore {
    dir: PathBuf,
}

impl FileConversationStore {
    /// Open (and create if needed) the storage directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ConversationStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(id)))
    }

    async fn write(&self, conversation: &Conversation) -> Result<(), ConversationStoreError> {
        let path = self.record_path(&conversation.id);
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let bytes = serde_json::to_vec_pretty(conversation)
            .map_err(|e| ConversationStoreError::Backend(e.to_string()))?;
        let written = match tokio::fs::write(&tmp, bytes).await {
            Ok(()) => tokio::fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(id = %conversation.id, path = %path.display(), "Conversation written");
        Ok(())
    }
}

/// Ids come from clients; keep them inside the storage directory.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn get(&self, id: &str) -> Result<Option<Conversation>, ConversationStoreError> {
        let path = self.record_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ConversationStoreError::Corrupt {
                id: id.to_string(),
                message: e.to_string(),
            })
    }

    async fn create(&self, id: &str) -> Result<Conversation, ConversationStoreError> {
        let conversation = Conversation::new(id);
        self.write(&conversation).await?;
        Ok(conversation)
    }

    async fn update(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, ConversationStoreError> {
        self.write(&conversation).await?;
        Ok(conversation)
    }
}
