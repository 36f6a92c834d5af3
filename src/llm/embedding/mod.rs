pub mod openai;

use async_trait::async_trait;

use super::LlmError;

pub use self::openai::OpenAIEmbeddingClient;

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, LlmError>;
}
