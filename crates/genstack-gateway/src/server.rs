use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use genstack_core::config::GatewayConfig;
use genstack_engine::WorkflowExecutor;
use genstack_retrieval::DocumentIngestor;

use crate::routes;
use crate::state::AppState;

/// HTTP gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    executor: Arc<WorkflowExecutor>,
    ingestor: Arc<DocumentIngestor>,
}

impl GatewayServer {
    pub fn new(
        config: GatewayConfig,
        executor: Arc<WorkflowExecutor>,
        ingestor: Arc<DocumentIngestor>,
    ) -> Self {
        Self {
            config,
            executor,
            ingestor,
        }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState {
            executor: self.executor.clone(),
            ingestor: self.ingestor.clone(),
        });

        let app = Router::new()
            .route("/", get(routes::root))
            .route("/api/health", get(routes::health))
            .route("/api/workflow/execute", post(routes::execute_workflow))
            .route("/api/documents/upload", post(routes::upload_document))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
