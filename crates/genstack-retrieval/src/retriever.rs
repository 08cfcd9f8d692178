use std::sync::Arc;

use tracing::debug;

use genstack_core::error::Result;
use genstack_core::traits::{EmbeddingClient, VectorStore};
use genstack_core::types::StackId;

/// Retrieves knowledge-base context for a query.
///
/// Embeds the query, runs a top-K similarity search against the stack's
/// collection, and joins the returned passages with newlines in store
/// order. No re-ranking.
pub struct ContextRetriever {
    embeddings: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl ContextRetriever {
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self {
            embeddings,
            store,
            top_k,
        }
    }

    /// Retrieve context for a query against a stack's knowledge base.
    ///
    /// Fails if the collection does not exist or the store is unreachable;
    /// a configured knowledge base that cannot be read is an error, never
    /// empty context.
    pub async fn retrieve(&self, stack_id: &StackId, query: &str) -> Result<String> {
        let vector = self.embeddings.embed(query).await?;
        let passages = self
            .store
            .query(&stack_id.collection_key(), vector, self.top_k)
            .await?;

        debug!(stack_id = %stack_id, passages = passages.len(), "Context retrieved");
        Ok(passages.join("\n"))
    }
}
