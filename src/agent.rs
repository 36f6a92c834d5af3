use futures::{ Stream, StreamExt };
use log::{ error, info, warn };
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::prompt::PromptConfig;
use crate::history::ConversationStore;
use crate::llm::chat::{
    create_streaming_response,
    ChatClient,
    ChatMessage,
    ChatRequest,
    ChatStream,
    StreamEvent,
};
use crate::llm::LlmError;
use crate::models::chat::{ Conversation, Message, Role };
use crate::tools::ToolRegistry;

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 1000;
const MAX_TOOL_ROUNDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeMode {
    /// Streamed reply; the model may call the registered tools first.
    Tools,
    /// Single completion without tools.
    Direct,
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("OpenAI API Error")] Llm(#[from] LlmError),
    #[error("Internal Server Error")] Request(String),
}

impl ExchangeError {
    pub fn details(&self) -> Value {
        match self {
            ExchangeError::Llm(e) => e.details(),
            ExchangeError::Request(msg) => Value::String(msg.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectReply {
    pub message: Message,
    pub conversation_id: String,
}

pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

pub struct StreamedReply {
    pub conversation_id: String,
    pub body: ReplyStream,
}

/// Runs one exchange: load history, append the user turn, call the model,
/// persist. Persistence is best-effort throughout; a store outage never fails
/// the exchange. There is no locking across requests, so concurrent exchanges
/// on one conversation race and the last save wins.
#[derive(Clone)]
pub struct ChatAgent {
    chat_client: Arc<dyn ChatClient>,
    history_store: Arc<dyn ConversationStore>,
    tools: ToolRegistry,
    prompts: Arc<PromptConfig>,
}

impl ChatAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        history_store: Arc<dyn ConversationStore>,
        tools: ToolRegistry,
        prompts: Arc<PromptConfig>
    ) -> Self {
        Self { chat_client, history_store, tools, prompts }
    }

    pub fn history_store(&self) -> &Arc<dyn ConversationStore> {
        &self.history_store
    }

    pub fn resolve_conversation_id(requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    fn system_prompt(&self, mode: ExchangeMode) -> &str {
        match mode {
            ExchangeMode::Tools => &self.prompts.chat,
            ExchangeMode::Direct => &self.prompts.direct,
        }
    }

    async fn prepare(&self, mode: ExchangeMode, conversation_id: &str, incoming: &[Message]) -> Conversation {
        if let Some(last) = incoming.last() {
            info!("Incoming message ({}): {} chars", last.role, last.content.len());
        }

        let mut conversation = match self.history_store.get(conversation_id).await.found() {
            Some(existing) if !existing.messages.is_empty() => existing,
            Some(existing) => {
                let mut seeded = Conversation::seeded(conversation_id, self.system_prompt(mode));
                seeded.created_at = existing.created_at;
                seeded
            }
            None => Conversation::seeded(conversation_id, self.system_prompt(mode)),
        };

        if let Some(last) = incoming.last().filter(|m| m.role == Role::User) {
            conversation.push(Message::user(last.content.clone()));
        }

        if !self.history_store.save(&conversation).await.succeeded() {
            info!("Failed to save conversation {} but continuing", conversation_id);
        }
        conversation
    }

    pub async fn direct_exchange(
        &self,
        requested_id: Option<&str>,
        incoming: &[Message]
    ) -> Result<DirectReply, ExchangeError> {
        let conversation_id = Self::resolve_conversation_id(requested_id);
        let mut conversation = self.prepare(ExchangeMode::Direct, &conversation_id, incoming).await;

        let request = ChatRequest::new(&conversation.messages, TEMPERATURE, MAX_TOKENS);
        let completion = self.chat_client.complete(&request).await.map_err(|e| {
            error!("OpenAI API error for conversation {}: {}", conversation_id, e);
            ExchangeError::Llm(e)
        })?;

        let message = Message::assistant(completion.text());
        conversation.push(message.clone());
        if !self.history_store.save(&conversation).await.succeeded() {
            info!("Failed to save conversation {} but continuing", conversation_id);
        }

        Ok(DirectReply { message, conversation_id })
    }

    /// Fails only if the first model round cannot be started; later failures
    /// end the body stream early.
    pub async fn streamed_exchange(
        &self,
        requested_id: Option<&str>,
        incoming: &[Message]
    ) -> Result<StreamedReply, ExchangeError> {
        let conversation_id = Self::resolve_conversation_id(requested_id);
        let conversation = self.prepare(ExchangeMode::Tools, &conversation_id, incoming).await;

        let request = ChatRequest::new(&conversation.messages, TEMPERATURE, MAX_TOKENS).with_tools(
            self.tools.definitions()
        );
        let first_round = self.chat_client.stream(&request).await.map_err(|e| {
            error!("OpenAI API error for conversation {}: {}", conversation_id, e);
            ExchangeError::Llm(e)
        })?;

        let agent = self.clone();
        let body = create_streaming_response(move |tx| async move {
            agent.drive_rounds(conversation, request, first_round, tx).await;
        });

        Ok(StreamedReply { conversation_id, body })
    }

    async fn drive_rounds(
        &self,
        mut conversation: Conversation,
        mut request: ChatRequest,
        mut stream: ChatStream,
        tx: mpsc::Sender<Result<String, LlmError>>
    ) {
        let mut reply = String::new();
        let mut client_gone = false;
        let mut rounds = 0;

        loop {
            let mut requested_calls = None;
            let mut round_text = String::new();
            while let Some(event) = stream.next().await {
                match event {
                    Ok(StreamEvent::Delta(text)) => {
                        round_text.push_str(&text);
                        reply.push_str(&text);
                        if !client_gone && tx.send(Ok(text)).await.is_err() {
                            warn!("Client for conversation {} went away mid-stream", conversation.id);
                            client_gone = true;
                        }
                    }
                    Ok(StreamEvent::ToolCalls(calls)) => {
                        requested_calls = Some(calls);
                    }
                    Err(e) => {
                        error!("OpenAI stream failed for conversation {}: {}", conversation.id, e);
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }

            let Some(calls) = requested_calls else {
                break;
            };
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                warn!("Tool round limit reached for conversation {}", conversation.id);
                break;
            }

            request.messages.push(ChatMessage::assistant_tool_calls(&round_text, calls.clone()));
            for call in &calls {
                let output = self.tools.dispatch(call).await;
                request.messages.push(ChatMessage::tool_result(call.id.clone(), output.content));
            }

            stream = match self.chat_client.stream(&request).await {
                Ok(next) => next,
                Err(e) => {
                    error!("OpenAI API error after tool call for conversation {}: {}", conversation.id, e);
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
        }

        if !reply.is_empty() {
            conversation.push(Message::assistant(reply));
        }
        if !self.history_store.save(&conversation).await.succeeded() {
            info!("Failed to save conversation {} but continuing", conversation.id);
        }
    }
}

#[cfg(test)]
#[path = "agent_test.rs"]
mod agent_test;
