pub mod storage;
pub mod transport;

pub use storage::{ ConversationIdStorage, FileIdStorage, MemoryIdStorage };
pub use transport::{ ChatReply, ChatTransport, HttpTransport, OutgoingChat };

use chrono::Utc;
use log::{ error, warn };
use std::error::Error;
use std::io::Write;
use thiserror::Error;
use tokio::io::{ AsyncBufReadExt, BufReader };
use url::Url;

use crate::cli::ChatArgs;
use crate::models::chat::{ Message, Role, CONVERSATION_PARAM };

pub const ERROR_REPLY: &str = "Sorry, there was an error processing your request.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")] Http(#[from] reqwest::Error),
    #[error("API error: {status}")] Status {
        status: u16,
        body: String,
    },
    #[error("Invalid URL: {0}")] Url(#[from] url::ParseError),
    #[error("Failed to access state file '{path}': {source}")] StateIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("State file '{path}' is not valid JSON: {source}")] StateJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Client-side view of one chat: the visible messages, the pending input and
/// the conversation id, mirrored into storage and the page URL.
pub struct ChatSession<S: ConversationIdStorage> {
    messages: Vec<Message>,
    input: String,
    loading: bool,
    conversation_id: Option<String>,
    page_url: Url,
    storage: S,
}

impl<S: ConversationIdStorage> ChatSession<S> {
    /// The URL `conversationId` parameter wins over the stored id and is written back.
    pub fn hydrate(page_url: Url, mut storage: S) -> Self {
        let from_url = page_url
            .query_pairs()
            .find(|(k, _)| k == CONVERSATION_PARAM)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());

        let conversation_id = match from_url {
            Some(id) => {
                if let Err(e) = storage.store(&id) {
                    warn!("Could not remember conversation {}: {}", id, e);
                }
                Some(id)
            }
            None => storage.load(),
        };

        Self {
            messages: Vec::new(),
            input: String::new(),
            loading: false,
            conversation_id,
            page_url,
            storage,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Appends the optimistic user message and returns the request to send.
    /// Blank input, or a submit while one is in flight, does nothing.
    pub fn begin_submit(&mut self) -> Option<OutgoingChat> {
        if self.loading || self.input.trim().is_empty() {
            return None;
        }

        let content = std::mem::take(&mut self.input);
        self.messages.push(Message::user(content).with_id(now_id()));
        self.loading = true;

        Some(OutgoingChat {
            messages: self.messages.clone(),
            conversation_id: self.conversation_id.clone(),
        })
    }

    pub fn finish_submit(&mut self, result: Result<ChatReply, ClientError>) {
        match result {
            Ok(reply) => {
                if self.conversation_id.is_none() {
                    if let Some(id) = reply.conversation_id {
                        self.adopt_conversation(id);
                    }
                }
                self.messages.push(
                    Message::new(Role::Assistant, reply.message.content).with_id(now_id())
                );
            }
            Err(e) => {
                error!("Error sending message: {}", e);
                self.messages.push(Message::assistant(ERROR_REPLY).with_id(now_id()));
            }
        }
        self.loading = false;
    }

    pub async fn submit<T: ChatTransport + ?Sized>(&mut self, transport: &T) -> Option<&Message> {
        let request = self.begin_submit()?;
        let result = transport.send(&request).await;
        self.finish_submit(result);
        self.messages.last()
    }

    pub fn new_conversation(&mut self) {
        if let Err(e) = self.storage.clear() {
            warn!("Could not clear stored conversation: {}", e);
        }
        self.conversation_id = None;
        self.messages.clear();
        set_conversation_param(&mut self.page_url, None);
    }

    fn adopt_conversation(&mut self, id: String) {
        if let Err(e) = self.storage.store(&id) {
            warn!("Could not remember conversation {}: {}", id, e);
        }
        set_conversation_param(&mut self.page_url, Some(&id));
        self.conversation_id = Some(id);
    }
}

fn now_id() -> String {
    Utc::now().timestamp_millis().to_string()
}

fn set_conversation_param(url: &mut Url, value: Option<&str>) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != CONVERSATION_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.set_query(None);
    if kept.is_empty() && value.is_none() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (k, v) in &kept {
        query.append_pair(k, v);
    }
    if let Some(v) = value {
        query.append_pair(CONVERSATION_PARAM, v);
    }
}

/// Interactive terminal chat against a running server.
pub async fn run_chat(args: &ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let transport = HttpTransport::new(&args.endpoint)?;
    let page_url = Url::parse(&args.page_url)?;
    let mut session = ChatSession::hydrate(page_url, FileIdStorage::new(&args.state_file));

    match session.conversation_id() {
        Some(id) => println!("Continuing conversation {}", id),
        None => println!("Starting a new conversation"),
    }
    println!("Ask anything about React Router. /new starts over, /quit exits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" => {
                break;
            }
            "/new" => {
                session.new_conversation();
                println!("Started a new conversation");
            }
            _ => {
                session.set_input(line);
                if let Some(reply) = session.submit(&transport).await {
                    println!("{}\n", reply.content);
                }
                if let Some(id) = session.conversation_id() {
                    log::debug!("Page URL: {} ({})", session.page_url(), id);
                }
            }
        }
    }

    Ok(())
}
