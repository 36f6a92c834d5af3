use async_trait::async_trait;
use log::{ info, warn };

use super::{ stamped, ConversationStore, StoreError, StoreOutcome };
use crate::models::chat::Conversation;
use crate::supabase::SupabaseClient;

pub struct SupabaseConversationStore {
    client: SupabaseClient,
    table: String,
}

impl SupabaseConversationStore {
    pub fn new(client: SupabaseClient, table: &str) -> Self {
        Self { client, table: table.to_string() }
    }
}

#[async_trait]
impl ConversationStore for SupabaseConversationStore {
    async fn get(&self, id: &str) -> StoreOutcome<Conversation> {
        match self.client.select_eq::<Conversation>(&self.table, "id", id).await {
            Ok(rows) =>
                match rows.into_iter().next() {
                    Some(conversation) => StoreOutcome::Ok(conversation),
                    None => {
                        info!("Starting new conversation {}", id);
                        StoreOutcome::NotFound
                    }
                }
            Err(e) => {
                info!("Error fetching conversation {}, starting new one: {}", id, e);
                StoreOutcome::Failed(StoreError::from(e))
            }
        }
    }

    async fn save(&self, conversation: &Conversation) -> StoreOutcome<()> {
        let record = stamped(conversation);
        match self.client.upsert(&self.table, &record).await {
            Ok(()) => StoreOutcome::Ok(()),
            Err(e) => {
                info!("Chat will continue but history not saved: {}", e);
                StoreOutcome::Failed(StoreError::from(e))
            }
        }
    }

    async fn delete(&self, id: &str) -> StoreOutcome<()> {
        match self.client.delete_eq(&self.table, "id", id).await {
            Ok(()) => StoreOutcome::Ok(()),
            Err(e) => {
                warn!("Could not delete conversation {}: {}", id, e);
                StoreOutcome::Failed(StoreError::from(e))
            }
        }
    }

    async fn list(&self, limit: usize) -> StoreOutcome<Vec<Conversation>> {
        match self.client.select_ordered::<Conversation>(&self.table, "updated_at", limit).await {
            Ok(rows) => StoreOutcome::Ok(rows),
            Err(e) => {
                warn!("Could not list conversations: {}", e);
                StoreOutcome::Failed(StoreError::from(e))
            }
        }
    }
}
