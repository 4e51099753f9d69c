//! Resolved configuration types consumed by the rest of the crate.

use std::path::PathBuf;

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the API listener to.
    pub bind: String,
}

/// MongoDB configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection string from `MONGODB_URI`. `None` selects the in-memory
    /// repositories. Never sourced from TOML.
    pub uri: Option<String>,
    /// Database name (`DB_NAME` env > `[database] name` > `proacademics`).
    pub db_name: String,
    /// Insert sample TopicVault entries and Lex questions into empty collections.
    pub seed_content: bool,
}

/// Upstream LLM endpoints and request shaping, from `[ai]`.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Vercel AI Gateway chat completions endpoint.
    pub gateway_url: String,
    /// OpenAI chat completions endpoint.
    pub openai_url: String,
    /// Model id sent to the gateway (provider-prefixed, e.g. `openai/gpt-4o-mini`).
    pub gateway_model: String,
    /// Model id sent to OpenAI directly.
    pub openai_model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Directory holding prompt template overrides.
    pub prompts_dir: PathBuf,
}

/// Provider credentials. Env only: `AI_GATEWAY_API_KEY`, `VERCEL_OIDC_TOKEN`,
/// `OPENAI_API_KEY`.
#[derive(Debug, Clone, Default)]
pub struct AiCredentials {
    pub gateway_api_key: Option<String>,
    pub vercel_oidc_token: Option<String>,
    pub openai_api_key: Option<String>,
}

/// Lex practice tuning, from `[lex]`.
#[derive(Debug, Clone)]
pub struct LexConfig {
    pub recent_window_days: i64,
    pub stale_after_days: i64,
    pub weak_rating_threshold: u8,
    pub recent_band: f64,
    pub weak_band: f64,
    pub session_length: u32,
    /// Sessions idle for longer than this are evicted.
    pub session_idle_minutes: i64,
}

/// Admin account seeded at startup when `ADMIN_EMAIL` and `ADMIN_PASSWORD`
/// are set. `ADMIN_NAME` is optional.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_name: String,
    pub log_level: String,
    /// Optional append-mode log file; stderr when `None`.
    pub log_file: Option<PathBuf>,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub ai_credentials: AiCredentials,
    pub lex: LexConfig,
    pub admin: Option<AdminSeed>,
}
