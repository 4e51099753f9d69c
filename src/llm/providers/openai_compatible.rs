//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! The Vercel AI Gateway (API key or OIDC token) and OpenAI itself speak the
//! same wire format, so one provider covers all three: only the endpoint,
//! model id and bearer credential differ. Wire types are private.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{ChatMessage, ProviderError};

use super::ProviderKind;

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    kind: ProviderKind,
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl OpenAiCompatibleProvider {
    /// `timeout_seconds` bounds the whole request, connect to last byte.
    pub fn new(
        kind: ProviderKind,
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { kind, client, api_base_url, model, temperature, api_key })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        debug!(
            provider = self.kind.as_str(),
            model = %self.model,
            messages = messages.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, timeout = e.is_timeout(), error = %e, "LLM HTTP request failed (transport)");
                if e.is_timeout() {
                    ProviderError::Request(format!("request timed out: {e}"))
                } else {
                    ProviderError::Request(e.to_string())
                }
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Request("empty or missing content in response".into()))
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pass successful responses through; turn anything else into a readable error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => format!("HTTP {status}: {}", env.error.message),
        Err(_) => format!("HTTP {status}: {body}"),
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}
