use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    // --- Server Args ---
    /// Address the HTTP API listens on
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:3000")]
    pub server_addr: String,

    /// Serve HTTPS instead of plain HTTP. Requires --tls-cert-path and --tls-key-path.
    #[arg(long, env = "ENABLE_TLS", default_value_t = false)]
    pub enable_tls: bool,

    /// Path to the PEM certificate chain
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the PEM private key
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    // --- OpenAI Args ---
    /// Base URL of the OpenAI API (without the /v1 suffix)
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com")]
    pub openai_base_url: String,

    /// Model used for chat completions
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o")]
    pub chat_model: String,

    /// Model used for query embeddings
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    // --- History Store Args ---
    /// Conversation store type (supabase, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "supabase")]
    pub history_type: String,

    /// Table holding conversation records
    #[arg(long, env = "CONVERSATIONS_TABLE", default_value = "conversations")]
    pub conversations_table: String,

    /// Similarity search function exposed by the database
    #[arg(long, env = "MATCH_DOCUMENTS_FN", default_value = "match_documents")]
    pub match_documents_fn: String,

    // --- Prompt Args ---
    /// Optional JSON file overriding the system prompts ({"chat": "...", "direct": "..."})
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Start even when required environment variables are missing
    #[arg(long, env = "SKIP_ENV_VALIDATION", default_value_t = false)]
    pub skip_env_validation: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Chat with a running server from the terminal
    Chat(ChatArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    /// Base URL of the assistant server
    #[arg(long, env = "ASSISTANT_ENDPOINT", default_value = "http://127.0.0.1:3000")]
    pub endpoint: String,

    /// Page URL to hydrate the conversation from; its conversationId parameter wins over the stored id
    #[arg(long, default_value = "http://127.0.0.1:3000/ai")]
    pub page_url: String,

    /// File holding the last used conversation id
    #[arg(long, env = "ASSISTANT_STATE_FILE", default_value = ".docs-assistant.json")]
    pub state_file: String,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
