use async_trait::async_trait;
use serde::Serialize;

use super::{ DocumentIndex, DocumentMatch };
use crate::supabase::{ SupabaseClient, SupabaseError };

#[derive(Serialize)]
struct MatchParams<'a> {
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: usize,
}

/// Similarity search through a Postgres function (pgvector) exposed over RPC.
pub struct SupabaseDocumentIndex {
    client: SupabaseClient,
    function: String,
}

impl SupabaseDocumentIndex {
    pub fn new(client: SupabaseClient, function: &str) -> Self {
        Self { client, function: function.to_string() }
    }
}

#[async_trait]
impl DocumentIndex for SupabaseDocumentIndex {
    async fn search(
        &self,
        embedding: &[f32],
        threshold: f32,
        count: usize
    ) -> Result<Vec<DocumentMatch>, SupabaseError> {
        let params = MatchParams {
            query_embedding: embedding,
            match_threshold: threshold,
            match_count: count,
        };
        let rows: Option<Vec<DocumentMatch>> = self.client.rpc(&self.function, &params).await?;
        Ok(rows.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_search_calls_match_function() {
        let mut server = mockito::Server::new_async().await;
        let handler = server
            .mock("POST", "/rest/v1/rpc/match_documents")
            .match_body(
                Matcher::Json(
                    serde_json::json!({
                    "query_embedding": [0.5, 0.25],
                    "match_threshold": 0.5,
                    "match_count": 5
                })
                )
            )
            .with_status(200)
            .with_body(r#"[{"title":"Loaders","content":"Load data.","url":null,"similarity":0.91}]"#)
            .create_async().await;

        let index = SupabaseDocumentIndex::new(
            SupabaseClient::new(&server.url(), "k").unwrap(),
            "match_documents"
        );
        let rows = index.search(&[0.5, 0.25], 0.5, 5).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("Loaders"));
        assert!(rows[0].url.is_none());
        handler.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_result_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/rpc/match_documents")
            .with_status(200)
            .with_body("null")
            .create_async().await;

        let index = SupabaseDocumentIndex::new(
            SupabaseClient::new(&server.url(), "k").unwrap(),
            "match_documents"
        );
        assert!(index.search(&[0.1], 0.5, 5).await.unwrap().is_empty());
    }
}
