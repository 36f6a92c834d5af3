use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ stamped, ConversationStore, StoreError, StoreOutcome };
use crate::models::chat::Conversation;

/// Process-local store. Behaves like the hosted table, including last-write-wins upserts.
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    unavailable: bool,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, as an unreachable backend would.
    pub fn unavailable() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    fn down<T>(&self) -> Option<StoreOutcome<T>> {
        self.unavailable.then(|| StoreOutcome::Failed(StoreError::Unavailable("memory store offline".into())))
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get(&self, id: &str) -> StoreOutcome<Conversation> {
        if let Some(outcome) = self.down() {
            return outcome;
        }
        match self.conversations.read().await.get(id) {
            Some(conversation) => StoreOutcome::Ok(conversation.clone()),
            None => StoreOutcome::NotFound,
        }
    }

    async fn save(&self, conversation: &Conversation) -> StoreOutcome<()> {
        if let Some(outcome) = self.down() {
            return outcome;
        }
        let record = stamped(conversation);
        self.conversations.write().await.insert(record.id.clone(), record);
        StoreOutcome::Ok(())
    }

    async fn delete(&self, id: &str) -> StoreOutcome<()> {
        if let Some(outcome) = self.down() {
            return outcome;
        }
        self.conversations.write().await.remove(id);
        StoreOutcome::Ok(())
    }

    async fn list(&self, limit: usize) -> StoreOutcome<Vec<Conversation>> {
        if let Some(outcome) = self.down() {
            return outcome;
        }
        let mut all: Vec<Conversation> = self.conversations.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all.truncate(limit);
        StoreOutcome::Ok(all)
    }
}
