mod memory;
mod supabase;

pub use memory::MemoryConversationStore;
pub use supabase::SupabaseConversationStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Settings;
use crate::models::chat::Conversation;
use crate::supabase::{ SupabaseClient, SupabaseError };

pub const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)] Supabase(#[from] SupabaseError),
    #[error("conversation store unavailable: {0}")] Unavailable(String),
    #[error("unsupported history store type: {0}")] UnsupportedType(String),
}

/// Result of a store operation. Stores never fail the caller: backend errors
/// are reported here and the caller decides how to degrade.
#[derive(Debug)]
pub enum StoreOutcome<T> {
    Ok(T),
    NotFound,
    Failed(StoreError),
}

impl<T> StoreOutcome<T> {
    pub fn succeeded(&self) -> bool {
        matches!(self, StoreOutcome::Ok(_))
    }

    /// Collapses not-found and backend errors alike into `None`.
    pub fn found(self) -> Option<T> {
        match self {
            StoreOutcome::Ok(value) => Some(value),
            StoreOutcome::NotFound | StoreOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StoreOutcome::Failed(_))
    }
}

impl<T> StoreOutcome<Vec<T>> {
    pub fn into_vec(self) -> Vec<T> {
        self.found().unwrap_or_default()
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backing table is provisioned out of band.
    async fn init(&self) -> bool {
        info!("Using existing conversations table");
        true
    }

    async fn get(&self, id: &str) -> StoreOutcome<Conversation>;

    /// Upserts by id, stamping `updated_at` and filling `created_at` when absent.
    async fn save(&self, conversation: &Conversation) -> StoreOutcome<()>;

    async fn delete(&self, id: &str) -> StoreOutcome<()>;

    /// Most recently updated first.
    async fn list(&self, limit: usize) -> StoreOutcome<Vec<Conversation>>;
}

pub(crate) fn stamped(conversation: &Conversation) -> Conversation {
    let now = chrono::Utc::now();
    let mut record = conversation.clone();
    record.updated_at = Some(now);
    record.created_at = Some(conversation.created_at.unwrap_or(now));
    record
}

pub fn create_history_store(settings: &Settings) -> Result<Arc<dyn ConversationStore>, StoreError> {
    match settings.history_type.to_lowercase().as_str() {
        "supabase" => {
            let client = SupabaseClient::new(&settings.supabase_url, &settings.supabase_key)?;
            Ok(Arc::new(SupabaseConversationStore::new(client, &settings.conversations_table)))
        }
        "memory" => Ok(Arc::new(MemoryConversationStore::new())),
        other => Err(StoreError::UnsupportedType(other.to_string())),
    }
}

pub async fn initialize_history_store(
    settings: &Settings
) -> Result<Arc<dyn ConversationStore>, StoreError> {
    info!("Chat history will be stored in: {}", settings.history_type);
    let store = create_history_store(settings)?;
    store.init().await;
    Ok(store)
}
