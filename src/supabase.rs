use log::debug;
use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE };
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("request to Supabase failed: {0}")] Http(#[from] reqwest::Error),
    #[error("Supabase returned status {status}: {body}")] Status {
        status: u16,
        body: String,
    },
    #[error("invalid Supabase key: {0}")] InvalidKey(String),
}

/// Thin PostgREST client: table reads/writes and RPC calls under `{url}/rest/v1`.
#[derive(Clone)]
pub struct SupabaseClient {
    http: HttpClient,
    rest_url: String,
}

impl SupabaseClient {
    pub fn new(url: &str, key: &str) -> Result<Self, SupabaseError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(key).map_err(|e| SupabaseError::InvalidKey(e.to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|e|
            SupabaseError::InvalidKey(e.to_string())
        )?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SupabaseError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(SupabaseError::Status { status: status.as_u16(), body })
    }

    pub async fn select_eq<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str
    ) -> Result<Vec<T>, SupabaseError> {
        debug!("Supabase select {} where {} = {}", table, column, value);
        let filter = format!("eq.{}", value);
        let resp = self.http
            .get(self.table_url(table))
            .query(&[("select", "*"), (column, filter.as_str())])
            .send().await?;
        Ok(Self::check(resp).await?.json::<Vec<T>>().await?)
    }

    pub async fn select_ordered<T: DeserializeOwned>(
        &self,
        table: &str,
        order_by: &str,
        limit: usize
    ) -> Result<Vec<T>, SupabaseError> {
        let order = format!("{}.desc", order_by);
        let limit = limit.to_string();
        let resp = self.http
            .get(self.table_url(table))
            .query(&[("select", "*"), ("order", order.as_str()), ("limit", limit.as_str())])
            .send().await?;
        Ok(Self::check(resp).await?.json::<Vec<T>>().await?)
    }

    /// Insert-or-update on the primary key.
    pub async fn upsert<R: Serialize + ?Sized>(&self, table: &str, row: &R) -> Result<(), SupabaseError> {
        let resp = self.http
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn delete_eq(&self, table: &str, column: &str, value: &str) -> Result<(), SupabaseError> {
        let filter = format!("eq.{}", value);
        let resp = self.http
            .delete(self.table_url(table))
            .query(&[(column, filter.as_str())])
            .send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn rpc<P, T>(&self, function: &str, params: &P) -> Result<T, SupabaseError>
        where P: Serialize + ?Sized, T: DeserializeOwned
    {
        let url = format!("{}/rpc/{}", self.rest_url, function);
        let resp = self.http.post(url).json(params).send().await?;
        Ok(Self::check(resp).await?.json::<T>().await?)
    }
}
