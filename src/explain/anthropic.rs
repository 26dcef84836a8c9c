//! Anthropic Claude API backend.
//!
//! Sends the prompt as one Messages API request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Availability, BackendKind, ExplainError, ExplainRequest, Explainer};

/// Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// System prompt for failure explanation
const SYSTEM_PROMPT: &str = "You are a helpful assistant that explains why a shell command failed. \
Be concise and practical. Focus on the most likely cause and give the exact command that fixes it when there is one.";

/// Anthropic explainer
pub struct AnthropicExplainer {
    client: Client,
    /// API key, empty when not configured
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicExplainer {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            max_tokens,
        }
    }

    /// Read the API key from the environment. A missing key is reported by
    /// the dependency gate, not here.
    pub fn from_env(model: String, max_tokens: u32) -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_default();
        Self::new(api_key, model, max_tokens)
    }

    fn build_request(&self, request: &ExplainRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt(),
            }],
        }
    }

    fn missing_key(&self) -> ExplainError {
        ExplainError::MissingApiKey {
            provider: "Anthropic".to_string(),
            env_var: API_KEY_ENV.to_string(),
        }
    }
}

#[async_trait]
impl Explainer for AnthropicExplainer {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn name(&self) -> &'static str {
        "Anthropic Claude"
    }

    fn check_available(&self) -> Availability {
        if self.api_key.is_empty() {
            Availability::Unavailable(self.missing_key().to_string())
        } else {
            Availability::Ready
        }
    }

    async fn explain(&self, request: &ExplainRequest) -> Result<String, ExplainError> {
        if self.api_key.is_empty() {
            return Err(self.missing_key());
        }
        let body = self.build_request(request);

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                return Err(ExplainError::RateLimited {
                    provider: "Anthropic".to_string(),
                });
            }
            return Err(ExplainError::Api {
                provider: "Anthropic".to_string(),
                message: format!("HTTP {}: {}", status, error_body),
            });
        }

        let response_body: MessagesResponse =
            response
                .json()
                .await
                .map_err(|err| ExplainError::InvalidResponse {
                    provider: "Anthropic".to_string(),
                    message: err.to_string(),
                })?;

        let text = collect_text(response_body);
        debug!(model = %self.model, chars = text.len(), "anthropic response");
        if text.trim().is_empty() {
            return Err(ExplainError::InvalidResponse {
                provider: "Anthropic".to_string(),
                message: "response contained no text".to_string(),
            });
        }
        Ok(text)
    }
}

fn collect_text(response: MessagesResponse) -> String {
    response
        .content
        .into_iter()
        .filter(|block| block.content_type == "text")
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

// API types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}
