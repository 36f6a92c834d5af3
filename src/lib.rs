pub mod agent;
pub mod cli;
pub mod client;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod rag;
pub mod server;
pub mod supabase;
pub mod tools;

#[cfg(test)]
mod testing;

use agent::ChatAgent;
use cli::{ Args, Command };
use config::env::{ EnvContext, Environment };
use config::prompt::load_prompts;
use config::Settings;
use history::initialize_history_store;
use llm::chat::OpenAIChatClient;
use llm::embedding::OpenAIEmbeddingClient;
use llm::LlmConfig;
use log::{ info, warn };
use rag::SupabaseDocumentIndex;
use server::api::{ AppState, OpenAICheck };
use server::Server;
use std::error::Error;
use std::sync::Arc;
use supabase::SupabaseClient;
use tools::{ ReactRouterDocsTool, ToolRegistry, WebSearchTool };

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command() {
        Command::Serve => serve(&args).await,
        Command::Chat(chat_args) => {
            let env = Environment::capture(EnvContext::Client);
            env.log_status();
            env.validate()?;
            client::run_chat(&chat_args).await
        }
    }
}

async fn serve(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let env = Environment::capture(EnvContext::Server);
    env.log_status();
    if args.skip_env_validation {
        warn!("Skipping environment validation");
    } else {
        env.validate()?;
    }

    let settings = Settings::from_args(args, &env)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", settings.server_addr);
    info!("TLS Enabled: {}", settings.tls.is_some());
    info!("Node Environment: {}", settings.node_env);
    info!("OpenAI Base URL: {}", settings.openai_base_url);
    info!("Chat Model: {}", settings.chat_model);
    info!("Embedding Model: {}", settings.embedding_model);
    info!("History Store Type: {}", settings.history_type);
    info!("Conversations Table: {}", settings.conversations_table);
    info!("Document Match Function: {}", settings.match_documents_fn);
    info!("Prompts Path: {}", settings.prompts_path.as_deref().unwrap_or("(built-in)"));
    info!("-------------------------");

    let prompts = load_prompts(settings.prompts_path.as_deref())?;
    let history_store = initialize_history_store(&settings).await?;

    let llm_config = LlmConfig {
        api_key: settings.openai_api_key.clone(),
        base_url: settings.openai_base_url.clone(),
        completion_model: settings.chat_model.clone(),
        embedding_model: settings.embedding_model.clone(),
    };
    let chat_client = Arc::new(OpenAIChatClient::from_config(&llm_config)?);
    let embedding_client = Arc::new(OpenAIEmbeddingClient::from_config(&llm_config)?);

    let supabase = SupabaseClient::new(&settings.supabase_url, &settings.supabase_key)?;
    let document_index = Arc::new(
        SupabaseDocumentIndex::new(supabase, &settings.match_documents_fn)
    );

    let tools = ToolRegistry::new()
        .with(Arc::new(ReactRouterDocsTool::new(embedding_client, document_index)))
        .with(Arc::new(WebSearchTool));

    let agent = ChatAgent::new(chat_client, history_store, tools, prompts);
    let state = AppState {
        agent,
        openai: OpenAICheck {
            api_key: settings.openai_api_key.clone(),
            model: settings.chat_model.clone(),
            base_url: settings.openai_base_url.clone(),
        },
    };

    let server = Server::new(settings.server_addr.clone(), settings.tls.clone(), state);
    server.run().await
}
