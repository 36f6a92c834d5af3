use async_trait::async_trait;
use log::error;
use serde_json::Value;
use std::sync::Arc;

use super::{ query_parameters, QueryArgs, Tool, ToolOutput };
use crate::llm::embedding::EmbeddingClient;
use crate::rag::{ format_documents_for_prompt, DocumentIndex, DocumentResult, MATCH_COUNT, MATCH_THRESHOLD };

pub const SEARCH_FAILED: &str = "Error searching documentation. Please try a different query.";
pub const NO_RESULTS: &str =
    "No relevant documentation found for this query. Try a more general search term or check the official React Router documentation.";
pub const UNEXPECTED_ERROR: &str =
    "An error occurred while searching the documentation. Please try again later.";

/// Retrieval over the documentation index: embed the query, run the
/// similarity search, hand the matches back as one text block.
pub struct ReactRouterDocsTool {
    embedding_client: Arc<dyn EmbeddingClient>,
    index: Arc<dyn DocumentIndex>,
}

impl ReactRouterDocsTool {
    pub fn new(embedding_client: Arc<dyn EmbeddingClient>, index: Arc<dyn DocumentIndex>) -> Self {
        Self { embedding_client, index }
    }

    pub async fn search(&self, query: &str) -> ToolOutput {
        let embedding = match self.embedding_client.embed(query).await {
            Ok(resp) => resp.embedding,
            Err(e) => {
                error!("Error generating embedding: {}", e);
                return ToolOutput::new(UNEXPECTED_ERROR);
            }
        };

        let matches = match self.index.search(&embedding, MATCH_THRESHOLD, MATCH_COUNT).await {
            Ok(matches) => matches,
            Err(e) => {
                error!("Error searching documentation: {}", e);
                return ToolOutput::new(SEARCH_FAILED);
            }
        };

        if matches.is_empty() {
            return ToolOutput::new(NO_RESULTS);
        }

        let results: Vec<DocumentResult> = matches.into_iter().map(DocumentResult::from).collect();
        ToolOutput::new(format_documents_for_prompt(&results))
    }
}

#[async_trait]
impl Tool for ReactRouterDocsTool {
    fn name(&self) -> &'static str {
        "react_router_docs"
    }

    fn description(&self) -> &'static str {
        "Search the React Router documentation for information about specific features, concepts, or APIs."
    }

    fn parameters(&self) -> Value {
        query_parameters("The search query for React Router documentation.")
    }

    async fn execute(&self, arguments: &str) -> ToolOutput {
        match serde_json::from_str::<QueryArgs>(arguments) {
            Ok(args) => self.search(&args.query).await,
            Err(e) => {
                error!("Error in react_router_docs arguments: {}", e);
                ToolOutput::new(UNEXPECTED_ERROR)
            }
        }
    }
}
