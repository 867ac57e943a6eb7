use async_trait::async_trait;
use orc_application::{ConversationStore, ConversationStoreError};
use orc_domain::Conversation;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Conversations kept in a map for the life of the process.
#[derive(Default)]
pub struct MemoryConversationStore {
    records: RwLock<HashMap<String, Conversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, id: &str) -> Result<Option<Conversation>, ConversationStoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn create(&self, id: &str) -> Result<Conversation, ConversationStoreError> {
        let conversation = Conversation::new(id);
        self.records
            .write()
            .await
            .insert(id.to_string(), conversation.clone());
        Ok(conversation)
    }

    async fn update(
        &self,
        conversation: Conversation,
    ) -> Result<Conversation, ConversationStoreError> {
        self.records
            .write()
            .await
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_domain::Interaction;

    #[tokio::test]
    async fn test_get_or_create_then_update() {
        let store = MemoryConversationStore::new();
        assert!(store.get("c1").await.unwrap().is_none());

        let mut conversation = store.get_or_create("c1").await.unwrap();
        assert!(conversation.is_empty());
        conversation.record_exchange("hi", "hello", Interaction::new("u", "n", 0.5));
        store.update(conversation).await.unwrap();

        let stored = store.get("c1").await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 2);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = MemoryConversationStore::new();
        let base = store.create("c1").await.unwrap();

        let mut first = base.clone();
        first.record_exchange("a", "b", Interaction::new("u", "n", 0.1));
        let mut second = base;
        second.record_exchange("c", "d", Interaction::new("u", "n", 0.1));
        second.record_exchange("e", "f", Interaction::new("u", "n", 0.1));

        store.update(first).await.unwrap();
        store.update(second).await.unwrap();
        assert_eq!(store.get("c1").await.unwrap().unwrap().history.len(), 4);
    }
}
