//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations and
//! `ProviderChain` is the ordered list the tutor routes talk to. A request
//! walks the chain once, front to back, and returns the first success.
//!
//! Provider instances are shared immutable capabilities; clone them freely.

pub mod providers;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no AI API keys configured")]
    NotConfigured,
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("unusable provider response: {0}")]
    BadResponse(String),
    #[error("all AI providers failed: {0}")]
    Exhausted(String),
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// One chat turn in OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch keeps `dyn` and `async-trait` out of the call path.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Dummy(providers::dummy::DummyProvider),
}

impl LlmProvider {
    /// Capability tag used in logs and `/api/health`.
    pub fn name(&self) -> &str {
        match self {
            LlmProvider::OpenAiCompatible(p) => p.kind().as_str(),
            LlmProvider::Dummy(_) => "dummy",
        }
    }

    /// One round-trip: send `messages`, return the assistant's text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        match self {
            LlmProvider::OpenAiCompatible(p) => p.complete(messages).await,
            LlmProvider::Dummy(p) => p.complete(messages).await,
        }
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// Ordered providers tried in turn. Each provider is called at most once per
/// request; there is no retry or backoff.
#[derive(Debug, Clone, Default)]
pub struct ProviderChain {
    providers: Vec<LlmProvider>,
}

impl ProviderChain {
    pub fn new(providers: Vec<LlmProvider>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        if self.providers.is_empty() {
            return Err(ProviderError::NotConfigured);
        }

        let mut failures = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.complete(messages).await {
                Ok(text) => {
                    debug!(provider = provider.name(), reply_len = text.len(), "llm reply received");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "llm provider failed, trying next");
                    failures.push(format!("{}: {e}", provider.name()));
                }
            }
        }
        Err(ProviderError::Exhausted(failures.join("; ")))
    }

    /// Convenience for the common system + user prompt pair.
    pub async fn complete_prompt(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        self.complete(&[ChatMessage::system(system), ChatMessage::user(user)]).await
    }
}
