use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use genstack_core::config::AppConfig;
use genstack_engine::WorkflowExecutor;
use genstack_gateway::GatewayServer;
use genstack_llm::OpenAiClient;
use genstack_retrieval::{ChromaStore, ContextRetriever, DocumentIngestor, OpenAiEmbeddings};
use genstack_search::SerpApiClient;

#[derive(Parser)]
#[command(name = "genstack", version, about = "Workflow execution engine for GenAI stacks")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "genstack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn serve(mut config: AppConfig, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        config.gateway.bind = bind;
    }

    if config.embedding.api_key.is_none() {
        warn!("No embedding API key configured; knowledge-base retrieval and uploads will fail");
    }

    let embeddings = Arc::new(OpenAiEmbeddings::new(
        &config.embedding.base_url,
        config.embedding.api_key.as_deref(),
        &config.embedding.model,
    ));
    let store = Arc::new(ChromaStore::new(&config.vector_store.base_url));

    let retriever = ContextRetriever::new(embeddings.clone(), store.clone(), config.engine.top_k);
    let ingestor = Arc::new(DocumentIngestor::new(
        embeddings,
        store,
        config.ingest.chunk_chars,
    ));

    let search = match config.search.base_url.as_deref() {
        Some(url) => Arc::new(SerpApiClient::with_base_url(url)),
        None => Arc::new(SerpApiClient::new()),
    };
    let llm = match config.llm.base_url.as_deref() {
        Some(url) => Arc::new(OpenAiClient::with_base_url(url)),
        None => Arc::new(OpenAiClient::new()),
    };

    let executor = Arc::new(WorkflowExecutor::new(
        retriever,
        search,
        llm,
        Duration::from_secs(config.engine.call_timeout_secs),
    ));

    let server = GatewayServer::new(config.gateway.clone(), executor, ingestor);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    server.run(shutdown).await
}
