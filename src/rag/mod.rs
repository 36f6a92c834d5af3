mod supabase;

pub use supabase::SupabaseDocumentIndex;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };

use crate::supabase::SupabaseError;

pub const MATCH_THRESHOLD: f32 = 0.5;
pub const MATCH_COUNT: usize = 5;
pub const DEFAULT_TITLE: &str = "React Router Documentation";
pub const DEFAULT_URL: &str = "https://reactrouter.com/docs/en/v7";

/// A raw row from the similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatch {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    pub similarity: f32,
}

/// A match ready for display, with the fallbacks applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResult {
    pub title: String,
    pub content: String,
    pub url: String,
    pub similarity: f32,
}

impl From<DocumentMatch> for DocumentResult {
    fn from(doc: DocumentMatch) -> Self {
        Self {
            title: doc.title.filter(|t| !t.is_empty()).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: doc.content,
            url: doc.url.filter(|u| !u.is_empty()).unwrap_or_else(|| DEFAULT_URL.to_string()),
            similarity: doc.similarity,
        }
    }
}

#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        count: usize
    ) -> Result<Vec<DocumentMatch>, SupabaseError>;
}

pub fn format_documents_for_prompt(results: &[DocumentResult]) -> String {
    let sections = results
        .iter()
        .map(|doc| format!("## {}\n{}\n\nSource: {}\n\n", doc.title, doc.content, doc.url))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Here are the most relevant documentation sections:\n\n{}", sections)
}
