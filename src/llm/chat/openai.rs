use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, error, info };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::collections::BTreeMap;

use super::sse::{ parse_line, LineBuffer, SseLine };
use super::{
    create_streaming_response,
    ChatClient,
    ChatMessage,
    ChatRequest,
    ChatStream,
    CompletionResponse,
    FunctionCall,
    StreamEvent,
    ToolCall,
    ToolDefinition,
};
use crate::llm::{ ensure_success, openai_http_client, LlmConfig, LlmError };

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAIDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAIToolCallDelta>,
}

#[derive(Deserialize)]
struct OpenAIToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<OpenAIFunctionDelta>,
}

#[derive(Deserialize)]
struct OpenAIFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

/// Tool calls arrive in fragments keyed by index; the id and name come once,
/// the arguments string is spread over many deltas.
#[derive(Default)]
struct ToolCallAssembler {
    calls: BTreeMap<usize, ToolCall>,
}

impl ToolCallAssembler {
    fn absorb(&mut self, fragment: OpenAIToolCallDelta) {
        let call = self.calls.entry(fragment.index).or_insert_with(|| ToolCall {
            id: String::new(),
            kind: "function".to_string(),
            function: FunctionCall { name: String::new(), arguments: String::new() },
        });
        if let Some(id) = fragment.id {
            call.id = id;
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                call.function.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                call.function.arguments.push_str(&arguments);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    fn take(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls).into_values().collect()
    }
}

enum Flow {
    Continue,
    Done,
    Closed,
}

type EventSender = tokio::sync::mpsc::Sender<Result<StreamEvent, LlmError>>;

async fn forward_line(line: &str, tx: &EventSender, tool_calls: &mut ToolCallAssembler) -> Flow {
    let data = match parse_line(line) {
        SseLine::Data(data) => data,
        SseLine::Done => {
            return Flow::Done;
        }
        SseLine::Ignored => {
            return Flow::Continue;
        }
    };
    let parsed = match serde_json::from_str::<OpenAIStreamResponse>(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Skipping unparseable stream chunk: {} ({})", data, e);
            return Flow::Continue;
        }
    };

    for choice in parsed.choices {
        if let Some(content) = choice.delta.content {
            if !content.is_empty() && tx.send(Ok(StreamEvent::Delta(content))).await.is_err() {
                return Flow::Closed;
            }
        }
        for fragment in choice.delta.tool_calls {
            tool_calls.absorb(fragment);
        }
        if choice.finish_reason.as_deref() == Some("tool_calls") && !tool_calls.is_empty() {
            if tx.send(Ok(StreamEvent::ToolCalls(tool_calls.take()))).await.is_err() {
                return Flow::Closed;
            }
        }
    }
    Flow::Continue
}

// Some proxies end the round without a finish_reason.
async fn flush_tool_calls(tx: &EventSender, tool_calls: &mut ToolCallAssembler) {
    if !tool_calls.is_empty() {
        let _ = tx.send(Ok(StreamEvent::ToolCalls(tool_calls.take()))).await;
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        let model = model.unwrap_or_else(|| "gpt-4o".to_string());
        let base_url = base_url.unwrap_or_else(|| crate::llm::DEFAULT_BASE_URL.to_string());
        let http = openai_http_client(api_key)?;

        Ok(Self {
            http,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(
            &config.api_key,
            Some(config.completion_model.clone()),
            Some(config.base_url.clone())
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn payload<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> OpenAIChatRequest<'a> {
        OpenAIChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(&request.tools)
            },
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, LlmError> {
        info!("Starting OpenAI request with message count: {}", request.messages.len());
        let resp = self.http.post(self.completions_url()).json(&self.payload(request, false)).send().await?;
        let resp = ensure_success(resp).await?;
        let body = resp.json::<OpenAIResponse>().await?;

        let choice = body.choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No response from OpenAI API".to_string()))?;

        Ok(CompletionResponse { message: choice.message })
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChatStream, LlmError> {
        info!("Starting OpenAI stream with message count: {}", request.messages.len());
        let resp = self.http.post(self.completions_url()).json(&self.payload(request, true)).send().await?;
        let resp = ensure_success(resp).await?;

        Ok(
            create_streaming_response(move |tx| async move {
                let mut bytes = resp.bytes_stream();
                let mut lines = LineBuffer::default();
                let mut tool_calls = ToolCallAssembler::default();

                while let Some(chunk) = bytes.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            error!("OpenAI stream interrupted: {}", e);
                            let _ = tx.send(Err(LlmError::Http(e))).await;
                            return;
                        }
                    };
                    for line in lines.push(&chunk) {
                        match forward_line(&line, &tx, &mut tool_calls).await {
                            Flow::Continue => {}
                            Flow::Done => {
                                return flush_tool_calls(&tx, &mut tool_calls).await;
                            }
                            Flow::Closed => {
                                return;
                            }
                        }
                    }
                }

                if let Some(rest) = lines.finish() {
                    if let Flow::Closed = forward_line(&rest, &tx, &mut tool_calls).await {
                        return;
                    }
                }
                flush_tool_calls(&tx, &mut tool_calls).await;
            })
        )
    }
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod openai_test;
