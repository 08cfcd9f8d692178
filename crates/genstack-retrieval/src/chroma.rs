use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use genstack_core::error::{Result, StackError};
use genstack_core::traits::VectorStore;

/// ChromaDB HTTP client.
///
/// Collections are addressed by name (`stack_{id}`); Chroma resolves names
/// to internal ids, so every operation starts with a lookup. A missing
/// collection on the query path is a retrieval failure, not an empty result.
pub struct ChromaStore {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Collection {
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<Vec<String>>,
}

impl ChromaStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a collection name to its Chroma id. 404 means the collection
    /// was never created — no documents were ever uploaded for this stack.
    async fn collection_id(&self, name: &str) -> Result<String> {
        let url = format!("{}/api/v1/collections/{}", self.base_url, name);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StackError::Retrieval(format!("vector store unreachable: {}", e)))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StackError::Retrieval(format!(
                "collection '{}' not found",
                name
            )));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StackError::Retrieval(format!(
                "vector store error {}: {}",
                status, body
            )));
        }

        let collection: Collection = resp.json().await.map_err(|e| {
            StackError::Retrieval(format!("failed to parse collection response: {}", e))
        })?;

        Ok(collection.id)
    }

    /// Get or create a collection, returning its Chroma id.
    async fn get_or_create(&self, name: &str) -> Result<String> {
        let url = format!("{}/api/v1/collections", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "name": name, "get_or_create": true }))
            .send()
            .await
            .map_err(|e| StackError::Retrieval(format!("vector store unreachable: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StackError::Retrieval(format!(
                "failed to create collection '{}': {} {}",
                name, status, body
            )));
        }

        let collection: Collection = resp.json().await.map_err(|e| {
            StackError::Retrieval(format!("failed to parse collection response: {}", e))
        })?;

        Ok(collection.id)
    }
}

impl VectorStore for ChromaStore {
    fn query(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> BoxFuture<'_, Result<Vec<String>>> {
        let collection = collection.to_string();

        Box::pin(async move {
            let id = self.collection_id(&collection).await?;

            let url = format!("{}/api/v1/collections/{}/query", self.base_url, id);
            let resp = self
                .http
                .post(&url)
                .json(&json!({
                    "query_embeddings": [vector],
                    "n_results": top_k,
                    "include": ["documents"],
                }))
                .send()
                .await
                .map_err(|e| StackError::Retrieval(format!("vector query failed: {}", e)))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(StackError::Retrieval(format!(
                    "vector query error {}: {}",
                    status, body
                )));
            }

            let parsed: QueryResponse = resp.json().await.map_err(|e| {
                StackError::Retrieval(format!("failed to parse query response: {}", e))
            })?;

            // One row of documents per query embedding; we send exactly one.
            let passages = parsed.documents.into_iter().next().unwrap_or_default();
            debug!(collection = %collection, passages = passages.len(), "Vector query complete");
            Ok(passages)
        })
    }

    fn add(
        &self,
        collection: &str,
        documents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> BoxFuture<'_, Result<()>> {
        let collection = collection.to_string();

        Box::pin(async move {
            let id = self.get_or_create(&collection).await?;

            let count = documents.len();
            let ids: Vec<String> = documents
                .iter()
                .map(|_| Uuid::new_v4().to_string())
                .collect();

            let url = format!("{}/api/v1/collections/{}/add", self.base_url, id);
            let resp = self
                .http
                .post(&url)
                .json(&json!({
                    "ids": ids,
                    "documents": documents,
                    "embeddings": embeddings,
                }))
                .send()
                .await
                .map_err(|e| StackError::Retrieval(format!("vector add failed: {}", e)))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(StackError::Retrieval(format!(
                    "vector add error {}: {}",
                    status, body
                )));
            }

            debug!(collection = %collection, count, "Documents added");
            Ok(())
        })
    }
}
