//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the file passed with `--config`), then applies environment overrides.
//!
//! # Module layout
//!
//! - **types**: public configuration structs (`Config`, `AiConfig`, …).
//! - **raw**: private TOML deserialization shapes with serde defaults.
//! - **load**: `load`, `load_from`, `[meta] base` merging, env overrides.

mod load;
mod raw;
mod types;

pub use load::{load, load_from, EnvOverrides};
pub use types::*;

impl Config {
    /// Safe `Config` for tests: in-memory storage, no AI credentials, no
    /// admin seed, prompts from a directory that does not exist.
    pub fn test_default() -> Self {
        Self {
            service_name: "test".into(),
            log_level: "info".into(),
            log_file: None,
            server: ServerConfig { bind: raw::default_bind() },
            database: DatabaseConfig {
                uri: None,
                db_name: raw::default_db_name(),
                seed_content: false,
            },
            ai: AiConfig {
                gateway_url: "http://localhost:0/v1/chat/completions".into(),
                openai_url: "http://localhost:0/v1/chat/completions".into(),
                gateway_model: "test-model".into(),
                openai_model: "test-model".into(),
                temperature: 0.0,
                timeout_seconds: 1,
                prompts_dir: "/nonexistent/prompts".into(),
            },
            ai_credentials: AiCredentials::default(),
            lex: LexConfig {
                recent_window_days: raw::default_recent_window_days(),
                stale_after_days: raw::default_stale_after_days(),
                weak_rating_threshold: raw::default_weak_rating_threshold(),
                recent_band: raw::default_recent_band(),
                weak_band: raw::default_weak_band(),
                session_length: raw::default_session_length(),
                session_idle_minutes: raw::default_session_idle_minutes(),
            },
            admin: None,
        }
    }
}
