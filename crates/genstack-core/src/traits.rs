use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{ChatMessage, Completion, SearchHit};

/// Embedding collaborator — turns text into a vector.
pub trait EmbeddingClient: Send + Sync + 'static {
    /// Embed a single text into a vector.
    fn embed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>>>;
}

/// Vector-store collaborator — similarity search over named collections.
pub trait VectorStore: Send + Sync + 'static {
    /// Top-K similarity query against a collection. Returns passages in the
    /// order the store ranked them; callers do not re-rank.
    fn query(
        &self,
        collection: &str,
        vector: Vec<f32>,
        top_k: usize,
    ) -> BoxFuture<'_, Result<Vec<String>>>;

    /// Add documents with precomputed embeddings to a collection, creating
    /// the collection if it does not exist.
    fn add(
        &self,
        collection: &str,
        documents: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> BoxFuture<'_, Result<()>>;
}

/// Web-search collaborator. The credential is an explicit per-call
/// parameter: it comes from the stack's node config, never ambient state.
pub trait SearchClient: Send + Sync + 'static {
    /// Run a search and return organic results in provider ranking order.
    fn search(&self, query: &str, api_key: &str) -> BoxFuture<'_, Result<Vec<SearchHit>>>;
}

/// Inference collaborator — a single non-streaming chat completion.
pub trait InferenceClient: Send + Sync + 'static {
    fn chat(
        &self,
        api_key: &str,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> BoxFuture<'_, Result<Completion>>;
}
