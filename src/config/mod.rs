pub mod env;
pub mod prompt;

use crate::cli::Args;
use env::{ Environment, OPENAI_API_KEY, SUPABASE_KEY, SUPABASE_URL, NODE_ENV };
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVars(Vec<String>),
    #[error("Both --tls-cert-path and --tls-key-path must be provided to enable TLS")]
    IncompleteTls,
    #[error("Failed to read prompts file '{path}': {source}")]
    PromptsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse prompts file '{path}': {source}")]
    PromptsJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_path: String,
    pub key_path: String,
}

/// Process-wide configuration, built once at startup and handed to every
/// component by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub tls: Option<TlsSettings>,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub supabase_url: String,
    pub supabase_key: String,
    pub history_type: String,
    pub conversations_table: String,
    pub match_documents_fn: String,
    pub prompts_path: Option<String>,
    pub node_env: String,
}

impl Settings {
    pub fn from_args(args: &Args, env: &Environment) -> Result<Self, ConfigError> {
        let tls = if args.enable_tls {
            match (&args.tls_cert_path, &args.tls_key_path) {
                (Some(cert_path), Some(key_path)) =>
                    Some(TlsSettings {
                        cert_path: cert_path.clone(),
                        key_path: key_path.clone(),
                    }),
                _ => {
                    return Err(ConfigError::IncompleteTls);
                }
            }
        } else {
            None
        };

        Ok(Self {
            server_addr: args.server_addr.clone(),
            tls,
            openai_api_key: env.get(OPENAI_API_KEY),
            openai_base_url: args.openai_base_url.trim_end_matches('/').to_string(),
            chat_model: args.chat_model.clone(),
            embedding_model: args.embedding_model.clone(),
            supabase_url: env.get(SUPABASE_URL).trim_end_matches('/').to_string(),
            supabase_key: env.get(SUPABASE_KEY),
            history_type: args.history_type.clone(),
            conversations_table: args.conversations_table.clone(),
            match_documents_fn: args.match_documents_fn.clone(),
            prompts_path: args.prompts_path.clone(),
            node_env: env.get(NODE_ENV),
        })
    }
}
