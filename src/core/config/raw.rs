//! Raw TOML shape: `serde` target before resolution.

use serde::Deserialize;

#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub service: RawService,
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub database: RawDatabase,
    #[serde(default)]
    pub ai: RawAi,
    #[serde(default)]
    pub lex: RawLex,
}

#[derive(Deserialize)]
pub(super) struct RawService {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for RawService {
    fn default() -> Self {
        Self { name: default_service_name(), log_level: default_log_level(), log_file: None }
    }
}

#[derive(Deserialize)]
pub(super) struct RawServer {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Deserialize)]
pub(super) struct RawDatabase {
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Defaults to `true`: empty content collections get sample entries.
    #[serde(default = "default_true")]
    pub seed_content: bool,
}

impl Default for RawDatabase {
    fn default() -> Self {
        Self { name: default_db_name(), seed_content: true }
    }
}

#[derive(Deserialize)]
pub(super) struct RawAi {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_openai_url")]
    pub openai_url: String,
    #[serde(default = "default_gateway_model")]
    pub gateway_model: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: String,
}

impl Default for RawAi {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            openai_url: default_openai_url(),
            gateway_model: default_gateway_model(),
            openai_model: default_openai_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            prompts_dir: default_prompts_dir(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawLex {
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: i64,
    #[serde(default = "default_weak_rating_threshold")]
    pub weak_rating_threshold: u8,
    #[serde(default = "default_recent_band")]
    pub recent_band: f64,
    #[serde(default = "default_weak_band")]
    pub weak_band: f64,
    #[serde(default = "default_session_length")]
    pub session_length: u32,
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: i64,
}

impl Default for RawLex {
    fn default() -> Self {
        Self {
            recent_window_days: default_recent_window_days(),
            stale_after_days: default_stale_after_days(),
            weak_rating_threshold: default_weak_rating_threshold(),
            recent_band: default_recent_band(),
            weak_band: default_weak_band(),
            session_length: default_session_length(),
            session_idle_minutes: default_session_idle_minutes(),
        }
    }
}

pub(super) fn default_service_name() -> String { "proacademics".to_string() }
pub(super) fn default_log_level() -> String { "info".to_string() }
pub(super) fn default_bind() -> String { "127.0.0.1:8080".to_string() }
pub(super) fn default_db_name() -> String { "proacademics".to_string() }
pub(super) fn default_gateway_url() -> String { "https://ai-gateway.vercel.sh/v1/chat/completions".to_string() }
pub(super) fn default_openai_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
pub(super) fn default_gateway_model() -> String { "openai/gpt-4o-mini".to_string() }
pub(super) fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
pub(super) fn default_temperature() -> f32 { 0.3 }
pub(super) fn default_timeout_seconds() -> u64 { 10 }
pub(super) fn default_prompts_dir() -> String { "config/prompts".to_string() }
pub(super) fn default_recent_window_days() -> i64 { 14 }
pub(super) fn default_stale_after_days() -> i64 { 28 }
pub(super) fn default_weak_rating_threshold() -> u8 { 70 }
pub(super) fn default_recent_band() -> f64 { 0.5 }
pub(super) fn default_weak_band() -> f64 { 0.9 }
pub(super) fn default_session_length() -> u32 { 20 }
pub(super) fn default_session_idle_minutes() -> i64 { 120 }

fn default_true() -> bool {
    true
}
