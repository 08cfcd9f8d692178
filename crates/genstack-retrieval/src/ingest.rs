use std::sync::Arc;

use tracing::info;

use genstack_core::error::Result;
use genstack_core::traits::{EmbeddingClient, VectorStore};
use genstack_core::types::StackId;

/// Splits uploaded documents into chunks, embeds them, and stores them in
/// the stack's collection.
pub struct DocumentIngestor {
    embeddings: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    chunk_chars: usize,
}

impl DocumentIngestor {
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        chunk_chars: usize,
    ) -> Self {
        Self {
            embeddings,
            store,
            chunk_chars,
        }
    }

    /// Ingest a document's text into the stack's knowledge base.
    ///
    /// Returns the length of the ingested text in characters.
    pub async fn ingest(&self, stack_id: &StackId, filename: &str, text: &str) -> Result<usize> {
        let text_length = text.chars().count();
        let chunks = chunk_text(text, self.chunk_chars);

        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            embeddings.push(self.embeddings.embed(chunk).await?);
        }

        if !chunks.is_empty() {
            self.store
                .add(&stack_id.collection_key(), chunks.clone(), embeddings)
                .await?;
        }

        info!(
            stack_id = %stack_id,
            filename = %filename,
            chunks = chunks.len(),
            text_length,
            "Document ingested"
        );

        Ok(text_length)
    }
}

/// Split text into chunks of at most `max_chars` characters, preferring
/// whitespace boundaries so passages stay readable.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
