//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::chat::{
    ChatClient,
    ChatMessage,
    ChatRequest,
    ChatStream,
    CompletionResponse,
    StreamEvent,
};
use crate::llm::LlmError;

pub(crate) enum Script {
    Events(Vec<StreamEvent>),
    /// Yields the events, then the connection drops.
    Interrupted(Vec<StreamEvent>),
    Fail(u16, &'static str),
}

/// Plays back scripted rounds; with an empty script it echoes the last message.
#[derive(Default)]
pub(crate) struct ScriptedChatClient {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_script(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_round(&self, request: &ChatRequest) -> Result<Vec<Result<StreamEvent, LlmError>>, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::Events(events)) => Ok(events.into_iter().map(Ok).collect()),
            Some(Script::Interrupted(events)) => {
                let mut items: Vec<_> = events.into_iter().map(Ok).collect();
                items.push(Err(LlmError::InvalidResponse("connection reset".to_string())));
                Ok(items)
            }
            Some(Script::Fail(status, body)) => Err(LlmError::Status { status, body: body.to_string() }),
            None => {
                let last = request.messages
                    .last()
                    .and_then(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(vec![Ok(StreamEvent::Delta(format!("echo: {}", last)))])
            }
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, LlmError> {
        let mut text = String::new();
        for event in self.next_round(request)? {
            if let StreamEvent::Delta(delta) = event? {
                text.push_str(&delta);
            }
        }
        Ok(CompletionResponse {
            message: ChatMessage {
                role: crate::llm::chat::ChatRole::Assistant,
                content: Some(text),
                tool_calls: Vec::new(),
                tool_call_id: None,
            },
        })
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChatStream, LlmError> {
        let items = self.next_round(request)?;
        Ok(Box::pin(stream::iter(items)))
    }
}
