use super::ConfigError;
use log::info;
use serde::Deserialize;
use std::fs;
use std::sync::Arc;

const BASE_PROMPT: &str =
    "You are an AI assistant specialized in React Router. \n\
You provide helpful, accurate, and concise information about React Router concepts, APIs, and best practices.\n\
Always provide code examples when relevant.\n\
If you're not sure about something, admit it rather than making up information.";

const TOOLS_PROMPT: &str =
    "You have access to two tools:\n\
1. react_router_docs - Use this to search React Router documentation for specific information\n\
2. web_search - Use this for questions about current information that might not be in your training data\n\
\n\
Use these tools when appropriate to provide the most accurate and helpful responses.";

/// System instructions for the two exchange modes.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PromptConfig {
    /// Seed prompt for the tool-enabled streamed exchange.
    #[serde(default = "default_chat_prompt")]
    pub chat: String,
    /// Seed prompt for the plain completion exchange.
    #[serde(default = "default_direct_prompt")]
    pub direct: String,
}

fn default_chat_prompt() -> String {
    format!("{}\n{}", BASE_PROMPT, TOOLS_PROMPT)
}

fn default_direct_prompt() -> String {
    BASE_PROMPT.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            chat: default_chat_prompt(),
            direct: default_direct_prompt(),
        }
    }
}

pub fn load_prompts_from_str(json: &str, path: &str) -> Result<PromptConfig, ConfigError> {
    serde_json::from_str(json).map_err(|source| ConfigError::PromptsJson {
        path: path.to_string(),
        source,
    })
}

pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, ConfigError> {
    let Some(path) = path else {
        return Ok(Arc::new(PromptConfig::default()));
    };
    let file_content = fs::read_to_string(path).map_err(|source| ConfigError::PromptsIo {
        path: path.to_string(),
        source,
    })?;
    let config = load_prompts_from_str(&file_content, path)?;
    info!("Loaded system prompts from {}", path);
    Ok(Arc::new(config))
}
