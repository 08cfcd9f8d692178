use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use genstack_core::error::{Result, StackError};
use genstack_core::traits::EmbeddingClient;

/// HTTP-based embedding client compatible with OpenAI, Ollama, etc.
///
/// The embedding credential is service-level (it is not part of any stack's
/// node config), so it is injected here at construction.
pub struct OpenAiEmbeddings {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(String::from),
            model: model.to_string(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingClient for OpenAiEmbeddings {
    fn embed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>>> {
        let text = text.to_string();
        Box::pin(async move {
            let url = format!("{}/embeddings", self.base_url);

            let mut req = self.http.post(&url).json(&EmbeddingRequest {
                model: self.model.clone(),
                input: text,
            });

            if let Some(ref key) = self.api_key {
                req = req.bearer_auth(key);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| StackError::Retrieval(format!("embedding request failed: {}", e)))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(StackError::Retrieval(format!(
                    "embedding API error {}: {}",
                    status, body
                )));
            }

            let body: EmbeddingResponse = resp.json().await.map_err(|e| {
                StackError::Retrieval(format!("failed to parse embedding response: {}", e))
            })?;

            body.data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| {
                    StackError::Retrieval("embedding response contained no data".to_string())
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_response_parsing() {
        let raw = r#"{ "data": [{ "embedding": [0.1, -0.2, 0.3] }] }"#;
        let parsed: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiEmbeddings::new("https://api.openai.com/v1/", None, "test-model");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }
}
