pub mod docs;
pub mod web_search;

pub use docs::ReactRouterDocsTool;
pub use web_search::WebSearchTool;

use async_trait::async_trait;
use log::{ info, warn };
use serde::Deserialize;
use serde_json::{ json, Value };
use std::sync::Arc;

use crate::llm::chat::{ FunctionDefinition, ToolCall, ToolDefinition };

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
}

impl ToolOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryArgs {
    pub query: String,
}

pub fn query_parameters(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description,
            }
        },
        "required": ["query"],
    })
}

/// A capability the model may call mid-generation. Execution never fails:
/// problems are reported to the model as text.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> Value;
    async fn execute(&self, arguments: &str) -> ToolOutput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            kind: "function",
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters(),
            },
        }
    }
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutput {
        match self.tools.iter().find(|t| t.name() == call.function.name) {
            Some(tool) => {
                info!("Executing tool {} ({})", call.function.name, call.id);
                tool.execute(&call.function.arguments).await
            }
            None => {
                warn!("Model requested unknown tool: {}", call.function.name);
                ToolOutput::new(format!("Unknown tool: {}", call.function.name))
            }
        }
    }
}
