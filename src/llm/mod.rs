pub mod chat;
pub mod embedding;

use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE };
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to OpenAI failed: {0}")] Http(#[from] reqwest::Error),
    #[error("OpenAI returned status {status}: {body}")] Status {
        status: u16,
        body: String,
    },
    #[error("invalid OpenAI response: {0}")] InvalidResponse(String),
    #[error("invalid API key format: {0}")] InvalidKey(String),
    #[error("OpenAI embedding generation returned no results")]
    EmptyEmbedding,
}

impl LlmError {
    /// Structured detail for error payloads. Upstream JSON bodies are passed through as-is.
    pub fn details(&self) -> Value {
        match self {
            LlmError::Status { body, .. } =>
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone())),
            other => Value::String(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub completion_model: String,
    pub embedding_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            completion_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

pub(crate) fn openai_http_client(api_key: &str) -> Result<reqwest::Client, LlmError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
            LlmError::InvalidKey(e.to_string())
        )?
    );

    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

pub(crate) async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Status { status: status.as_u16(), body })
}
