use async_trait::async_trait;
use serde_json::Value;

use super::{ query_parameters, Tool, ToolOutput };

pub const NOT_IMPLEMENTED: &str =
    "Web search is not implemented yet. For now, I'll rely on my existing knowledge about React Router.";

/// Placeholder so the model sees a web search capability; no provider is wired up.
pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for current information about React Router or related technologies."
    }

    fn parameters(&self) -> Value {
        query_parameters("The search query for the web search.")
    }

    async fn execute(&self, _arguments: &str) -> ToolOutput {
        ToolOutput::new(NOT_IMPLEMENTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_returns_fixed_message() {
        for args in [r#"{"query":"react router 7 release date"}"#, "not json", ""] {
            assert_eq!(WebSearchTool.execute(args).await.content, NOT_IMPLEMENTED);
        }
    }
}
