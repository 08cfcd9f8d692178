use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use genstack_core::error::{Result, StackError};
use genstack_core::traits::SearchClient;
use genstack_core::types::SearchHit;

const SERPAPI_URL: &str = "https://serpapi.com/search";

/// Number of organic results folded into the prompt digest.
const DIGEST_RESULTS: usize = 3;

/// SerpAPI client. The API key is a per-call parameter supplied from the
/// stack's llmEngine node config.
pub struct SerpApiClient {
    http: Client,
    base_url: String,
}

impl SerpApiClient {
    pub fn new() -> Self {
        Self::with_base_url(SERPAPI_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.to_string(),
        }
    }
}

impl Default for SerpApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<SearchHit>,
}

impl SearchClient for SerpApiClient {
    fn search(&self, query: &str, api_key: &str) -> BoxFuture<'_, Result<Vec<SearchHit>>> {
        let query = query.to_string();
        let api_key = api_key.to_string();

        Box::pin(async move {
            let resp = self
                .http
                .get(&self.base_url)
                .query(&[("q", query.as_str()), ("api_key", api_key.as_str())])
                .send()
                .await
                .map_err(|e| StackError::Search(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_else(|_| "unknown".to_string());
                return Err(StackError::Search(format!("HTTP {}: {}", status, body)));
            }

            let parsed: SearchResponse = resp
                .json()
                .await
                .map_err(|e| StackError::Search(format!("invalid response body: {}", e)))?;

            debug!(results = parsed.organic_results.len(), "Web search complete");
            Ok(parsed.organic_results)
        })
    }
}

/// Fold search hits into a short prompt digest: the first three snippets,
/// joined with newlines, in provider ranking order. A hit without a snippet
/// contributes an empty slot rather than shifting the others.
pub fn digest(hits: &[SearchHit]) -> String {
    hits.iter()
        .take(DIGEST_RESULTS)
        .map(|h| h.snippet.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}
