//! Conversation store port
//!
//! Persistence for conversation records. A record is read once when a
//! request starts and written once when it ends; concurrent writers to the
//! same id are last-writer-wins.

use async_trait::async_trait;
use orc_domain::Conversation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversationStoreError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt conversation record {id}: {message}")]
    Corrupt { id: String, message: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation, `None` when the id has never been written.
    async fn get(&self, id: &str) -> Result<Option<Conversation>, ConversationStoreError>;

    /// Create and persist an empty conversation under `id`.
    async fn create(&self, id: &str) -> Result<Conversation, ConversationStoreError>;

    /// Replace the stored record with `conversation`.
    async fn update(&self, conversation: Conversation)
    -> Result<Conversation, ConversationStoreError>;

    /// Fetch `id`, creating it when absent.
    async fn get_or_create(&self, id: &str) -> Result<Conversation, ConversationStoreError> {
        match self.get(id).await? {
            Some(conversation) => Ok(conversation),
            None => self.create(id).await,
        }
    }
}
