use std::sync::Arc;

use genstack_engine::WorkflowExecutor;
use genstack_retrieval::DocumentIngestor;

/// Shared application state for axum handlers.
pub struct AppState {
    pub executor: Arc<WorkflowExecutor>,
    pub ingestor: Arc<DocumentIngestor>,
}
