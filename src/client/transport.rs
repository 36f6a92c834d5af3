use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{ Deserialize, Serialize };
use url::Url;

use super::ClientError;
use crate::models::chat::{ Message, CONVERSATION_ID_HEADER, CONVERSATION_PARAM };

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingChat {
    pub messages: Vec<Message>,
    #[serde(skip)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub message: Message,
    /// Value of the `X-Conversation-Id` response header, falling back to the body.
    pub conversation_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectChatBody {
    message: Message,
    conversation_id: Option<String>,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &OutgoingChat) -> Result<ChatReply, ClientError>;
}

/// Talks to the non-streamed `/api/direct-chat` endpoint.
pub struct HttpTransport {
    http: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        Ok(Self { http: Client::new(), endpoint: Url::parse(endpoint)? })
    }

    fn direct_chat_url(&self, conversation_id: Option<&str>) -> Result<Url, ClientError> {
        let mut url = self.endpoint.join("/api/direct-chat")?;
        if let Some(id) = conversation_id {
            url.query_pairs_mut().append_pair(CONVERSATION_PARAM, id);
        }
        Ok(url)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &OutgoingChat) -> Result<ChatReply, ClientError> {
        let url = self.direct_chat_url(request.conversation_id.as_deref())?;
        debug!("POST {} with {} messages", url, request.messages.len());

        let resp = self.http.post(url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status { status: status.as_u16(), body });
        }

        let header_id = resp
            .headers()
            .get(CONVERSATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let body: DirectChatBody = resp.json().await?;

        Ok(ChatReply {
            message: body.message,
            conversation_id: header_id.or(body.conversation_id),
        })
    }
}
