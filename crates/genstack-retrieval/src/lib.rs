pub mod chroma;
pub mod embeddings;
pub mod ingest;
pub mod retriever;

pub use chroma::ChromaStore;
pub use embeddings::OpenAiEmbeddings;
pub use ingest::DocumentIngestor;
pub use retriever::ContextRetriever;
