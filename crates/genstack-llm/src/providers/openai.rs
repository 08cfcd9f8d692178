use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use genstack_core::error::{Result, StackError};
use genstack_core::traits::InferenceClient;
use genstack_core::types::{ChatMessage, Completion, Role, TokenUsage};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible client. Works with OpenAI, Ollama, vLLM, Groq, etc.
///
/// The API key is a per-call parameter: it belongs to the stack's llmEngine
/// node, not to this client.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new() -> Self {
        Self::with_base_url(OPENAI_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.to_string(),
        }
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

// Request types
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<OaiMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct OaiMessage {
    role: &'static str,
    content: String,
}

impl From<ChatMessage> for OaiMessage {
    fn from(msg: ChatMessage) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role,
            content: msg.content,
        }
    }
}

// Response types
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl InferenceClient for OpenAiClient {
    fn chat(
        &self,
        api_key: &str,
        model: &str,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> BoxFuture<'_, Result<Completion>> {
        let api_key = api_key.to_string();
        let model = model.to_string();

        Box::pin(async move {
            let body = ChatRequest {
                model: model.clone(),
                messages: messages.into_iter().map(OaiMessage::from).collect(),
                temperature,
            };

            debug!(model = %model, "Sending chat completion request");

            let response = self
                .http
                .post(&self.base_url)
                .bearer_auth(&api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| StackError::Inference(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(StackError::Inference(format!("HTTP {}: {}", status, body)));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| StackError::Inference(format!("invalid response body: {}", e)))?;

            let choice = parsed.choices.into_iter().next().ok_or_else(|| {
                StackError::Inference("response contained no choices".to_string())
            })?;

            Ok(Completion {
                text: choice.message.content.unwrap_or_default(),
                usage: parsed.usage,
            })
        })
    }
}
