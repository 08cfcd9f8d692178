use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info};

use genstack_core::error::StackError;
use genstack_core::types::{ExecutionRequest, ExecutionResult, StackId};

use crate::state::AppState;

/// Wrapper mapping `StackError` kinds to HTTP responses. Client-side errors
/// (missing LLM node, bad config, bad request) become 400; collaborator
/// failures become 500. The originating message is surfaced verbatim.
pub struct ApiError(pub StackError);

impl From<StackError> for ApiError {
    fn from(err: StackError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = Json(serde_json::json!({ "detail": self.0.to_string() }));
        (status, body).into_response()
    }
}

// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "GenAI Stack API" }))
}

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// POST /api/workflow/execute
pub async fn execute_workflow(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecutionRequest>,
) -> Result<Json<ExecutionResult>, ApiError> {
    if request.query.is_empty() {
        return Err(StackError::Validation("query must not be empty".to_string()).into());
    }

    match state.executor.execute(request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!(error = %e, "Workflow execution failed");
            Err(e.into())
        }
    }
}

// POST /api/documents/upload — multipart: `file` + `stack_id`
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut stack_id: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StackError::Validation(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("stack_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| StackError::Validation(format!("invalid stack_id: {}", e)))?;
                stack_id = Some(value);
            }
            Some("file") => {
                filename = field.file_name().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| StackError::Validation(format!("invalid file field: {}", e)))?;
                content = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    let stack_id = stack_id
        .ok_or_else(|| StackError::Validation("missing stack_id field".to_string()))?;
    let content =
        content.ok_or_else(|| StackError::Validation("missing file field".to_string()))?;
    let filename = filename.unwrap_or_else(|| "upload".to_string());

    // PDF extraction happens upstream; this boundary accepts plain text.
    let text = String::from_utf8_lossy(&content).into_owned();

    let stack_id = StackId::new(stack_id);
    let text_length = state.ingestor.ingest(&stack_id, &filename, &text).await?;

    info!(stack_id = %stack_id, filename = %filename, text_length, "Document uploaded");

    Ok(Json(serde_json::json!({
        "success": true,
        "filename": filename,
        "text_length": text_length,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_status_mapping() {
        let resp = ApiError(StackError::Configuration("LLM node not found".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError(StackError::Validation("bad body".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError(StackError::Retrieval("collection missing".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = ApiError(StackError::Search("down".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = ApiError(StackError::Inference("rate limited".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body_preserves_message() {
        let resp = ApiError(StackError::Inference("HTTP 429: rate limited".into()))
            .into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "LLM request failed: HTTP 429: rate limited");
    }
}
