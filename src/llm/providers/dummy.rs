//! Dummy LLM provider: answers with a fixed reply or a fixed failure.
//! Used to exercise the tutor routes without network access.

use crate::llm::{ChatMessage, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider {
    reply: Result<String, String>,
}

impl DummyProvider {
    pub fn replying(text: impl Into<String>) -> Self {
        Self { reply: Ok(text.into()) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { reply: Err(message.into()) }
    }

    pub async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.reply.clone().map_err(ProviderError::Request)
    }
}
