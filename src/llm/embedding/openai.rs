use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ EmbeddingClient, EmbeddingResponse };
use crate::llm::{ ensure_success, openai_http_client, LlmConfig, LlmError };

pub struct OpenAIEmbeddingClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingList {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAIEmbeddingClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        let model = model.unwrap_or_else(|| "text-embedding-3-small".to_string());
        let base_url = base_url.unwrap_or_else(|| crate::llm::DEFAULT_BASE_URL.to_string());

        Ok(Self {
            http: openai_http_client(api_key)?,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(
            &config.api_key,
            Some(config.embedding_model.clone()),
            Some(config.base_url.clone())
        )
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, LlmError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let resp = self.http
            .post(&url)
            .json(&(EmbeddingRequest { input: text, model: &self.model }))
            .send().await?;
        let list = ensure_success(resp).await?.json::<EmbeddingList>().await?;

        let embedding = list.data.into_iter().next().ok_or(LlmError::EmptyEmbedding)?.embedding;

        Ok(EmbeddingResponse { embedding })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let mut server = mockito::Server::new_async().await;
        let handler = server
            .mock("POST", "/v1/embeddings")
            .match_header("Authorization", "Bearer test_token")
            .match_body(
                mockito::Matcher::Json(
                    serde_json::json!({ "input": "loaders", "model": "text-embedding-3-small" })
                )
            )
            .with_status(200)
            .with_body(r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.25,-0.5,1.0]}]}"#)
            .create_async().await;

        let client = OpenAIEmbeddingClient::new("test_token", None, Some(server.url())).unwrap();
        let resp = client.embed("loaders").await.unwrap();

        assert_eq!(resp.embedding, vec![0.25, -0.5, 1.0]);
        handler.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_empty_data_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async().await;

        let client = OpenAIEmbeddingClient::new("k", None, Some(server.url())).unwrap();
        assert!(matches!(client.embed("x").await, Err(LlmError::EmptyEmbedding)));
    }

    #[tokio::test]
    async fn test_embed_error_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/v1/embeddings").with_status(500).create_async().await;

        let client = OpenAIEmbeddingClient::new("k", None, Some(server.url())).unwrap();
        assert!(matches!(client.embed("x").await, Err(LlmError::Status { status: 500, .. })));
    }
}
