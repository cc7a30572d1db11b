//! OpenAI chat completions client (raw HTTP via reqwest)
//!
//! Endpoint: POST {base_url}/v1/chat/completions with Bearer authentication.
//! Any OpenAI-compatible server works by overriding the base URL.

use crate::domain::errors::LlmError;
use crate::domain::repositories::language_model::{
    ChatMessage, ChatRequest, LanguageModel, ResponseFormat,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;
use zeroize::Zeroizing;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ENDPOINT_CHAT: &str = "/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    pub model: String,
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    /// Set instead of `content` when a structured reply is refused
    #[serde(default)]
    pub refusal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

pub struct OpenAiClient {
    api_key: Zeroizing<String>,
    client: Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl OpenAiClient {
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Optional model override (defaults to [`DEFAULT_MODEL`])
    pub fn new(api_key: &str, model: Option<String>) -> Result<Self, String> {
        if api_key.trim().is_empty() {
            return Err("OpenAI API key cannot be empty".to_string());
        }

        Ok(Self {
            api_key: Zeroizing::new(api_key.to_string()),
            client: Client::new(),
            base_url: OPENAI_BASE_URL.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_request(&self, request: ChatRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: request.messages,
            max_tokens: request.max_tokens,
            response_format: request.response_format,
        }
    }
}

/// Text of the first choice
pub fn parse_response(response: OpenAiResponse) -> Result<String, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

    if let Some(refusal) = choice.message.refusal {
        return Err(LlmError::InvalidResponse(format!(
            "Model refused: {}",
            refusal
        )));
    }

    choice
        .message
        .content
        .ok_or_else(|| LlmError::InvalidResponse("Empty message content".to_string()))
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let body = self.build_request(request);
        let url = format!("{}{}", self.base_url, ENDPOINT_CHAT);

        debug!("Calling chat completions: model={}", body.model);

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.as_str()))
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    LlmError::NetworkError(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Chat completion ({}) took {}ms, tokens {} in / {} out",
                parsed.model,
                start.elapsed().as_millis(),
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        parse_response(parsed)
    }
}
