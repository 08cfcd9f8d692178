use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    // Workflow errors
    #[error("Workflow configuration error: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    // Collaborator errors
    #[error("Context retrieval failed: {0}")]
    Retrieval(String),

    #[error("Web search failed: {0}")]
    Search(String),

    #[error("LLM request failed: {0}")]
    Inference(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StackError {
    /// Whether this error is the caller's fault (bad request) rather than
    /// a downstream failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
