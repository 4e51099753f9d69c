//! LLM provider implementations.
//!
//! `build_chain(config, credentials)` is the factory called at startup.
//! Credential priority: `AI_GATEWAY_API_KEY` → `VERCEL_OIDC_TOKEN` →
//! `OPENAI_API_KEY`. Only credentials that are present produce a provider.

pub mod dummy;
pub mod openai_compatible;

use crate::config::{AiConfig, AiCredentials};
use crate::llm::{LlmProvider, ProviderChain, ProviderError};

use openai_compatible::OpenAiCompatibleProvider;

/// Which upstream a provider talks to and how it authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Vercel AI Gateway with a static API key.
    AiGateway,
    /// Vercel AI Gateway with the deployment's OIDC token.
    VercelOidc,
    /// OpenAI directly.
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::AiGateway => "ai-gateway",
            ProviderKind::VercelOidc => "vercel-oidc",
            ProviderKind::OpenAi => "openai",
        }
    }
}

/// Build the provider chain in credential priority order.
/// An empty chain is valid; requests against it fail with `NotConfigured`.
pub fn build_chain(config: &AiConfig, credentials: &AiCredentials) -> Result<ProviderChain, ProviderError> {
    let candidates = [
        (ProviderKind::AiGateway, &credentials.gateway_api_key, &config.gateway_url, &config.gateway_model),
        (ProviderKind::VercelOidc, &credentials.vercel_oidc_token, &config.gateway_url, &config.gateway_model),
        (ProviderKind::OpenAi, &credentials.openai_api_key, &config.openai_url, &config.openai_model),
    ];

    let mut providers = Vec::new();
    for (kind, credential, url, model) in candidates {
        let Some(key) = credential else { continue };
        let p = OpenAiCompatibleProvider::new(
            kind,
            url.clone(),
            model.clone(),
            config.temperature,
            config.timeout_seconds,
            key.clone(),
        )?;
        providers.push(LlmProvider::OpenAiCompatible(p));
    }
    Ok(ProviderChain::new(providers))
}
