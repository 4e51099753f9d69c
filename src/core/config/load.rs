//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, follows `[meta] base = "..."` inheritance chains, then
//! applies environment overrides. Secrets only ever come from the environment.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

/// Values read from the process environment.
///
/// Tests build this directly instead of mutating env vars.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub bind: Option<String>,
    pub log_level: Option<String>,
    pub mongodb_uri: Option<String>,
    pub db_name: Option<String>,
    pub ai_gateway_api_key: Option<String>,
    pub vercel_oidc_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            bind: env_nonempty("PROACADEMICS_BIND"),
            log_level: env_nonempty("PROACADEMICS_LOG_LEVEL"),
            mongodb_uri: env_nonempty("MONGODB_URI"),
            db_name: env_nonempty("DB_NAME"),
            ai_gateway_api_key: env_nonempty("AI_GATEWAY_API_KEY"),
            vercel_oidc_token: env_nonempty("VERCEL_OIDC_TOKEN"),
            openai_api_key: env_nonempty("OPENAI_API_KEY"),
            admin_email: env_nonempty("ADMIN_EMAIL"),
            admin_password: env_nonempty("ADMIN_PASSWORD"),
            admin_name: env_nonempty("ADMIN_NAME"),
        }
    }
}

/// Empty values count as unset.
fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Deep-merge two TOML values. Tables merge recursively; any other overlay
/// value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read `path`, follow its `[meta] base` chain and return the merged value.
/// `visited` holds canonical paths already seen so cycles are rejected.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    let overlay: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let base = overlay
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
        .map(|b| {
            if Path::new(b).is_absolute() {
                PathBuf::from(b)
            } else {
                path.parent().unwrap_or(Path::new(".")).join(b)
            }
        });

    match base {
        Some(base_path) => Ok(merge_toml(load_raw_merged(&base_path, visited)?, overlay)),
        None => Ok(overlay),
    }
}

/// Load config from `config_path`, or `config/default.toml` when present,
/// falling back to built-in defaults. Env overrides are applied last.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = EnvOverrides::from_env();
    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }
    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        resolve(RawConfig::default(), &overrides)
    }
}

/// Load an explicit file with explicit overrides.
pub fn load_from(path: &Path, overrides: &EnvOverrides) -> Result<Config, AppError> {
    let merged = load_raw_merged(path, &mut HashSet::new())?;
    let raw: RawConfig = merged
        .try_into()
        .map_err(|e| AppError::Config(format!("invalid config in {}: {e}", path.display())))?;
    resolve(raw, overrides)
}

/// Ten years; keeps `now - Duration::days(..)` well inside chrono's range.
const MAX_WINDOW_DAYS: i64 = 3650;
/// One week.
const MAX_IDLE_MINUTES: i64 = 7 * 24 * 60;

fn resolve(raw: RawConfig, env: &EnvOverrides) -> Result<Config, AppError> {
    let lex = LexConfig {
        recent_window_days: raw.lex.recent_window_days,
        stale_after_days: raw.lex.stale_after_days,
        weak_rating_threshold: raw.lex.weak_rating_threshold,
        recent_band: raw.lex.recent_band,
        weak_band: raw.lex.weak_band,
        session_length: raw.lex.session_length,
        session_idle_minutes: raw.lex.session_idle_minutes,
    };
    if !(0.0..=1.0).contains(&lex.recent_band)
        || !(0.0..=1.0).contains(&lex.weak_band)
        || lex.recent_band > lex.weak_band
    {
        return Err(AppError::Config(format!(
            "lex bands must satisfy 0 <= recent_band ({}) <= weak_band ({}) <= 1",
            lex.recent_band, lex.weak_band
        )));
    }
    for (key, days) in [
        ("lex.recent_window_days", lex.recent_window_days),
        ("lex.stale_after_days", lex.stale_after_days),
    ] {
        if !(0..=MAX_WINDOW_DAYS).contains(&days) {
            return Err(AppError::Config(format!("{key} must be within 0..={MAX_WINDOW_DAYS}, got {days}")));
        }
    }
    if !(1..=MAX_IDLE_MINUTES).contains(&lex.session_idle_minutes) {
        return Err(AppError::Config(format!(
            "lex.session_idle_minutes must be within 1..={MAX_IDLE_MINUTES}, got {}",
            lex.session_idle_minutes
        )));
    }
    if lex.session_length == 0 {
        return Err(AppError::Config("lex.session_length must be at least 1".into()));
    }
    if raw.ai.timeout_seconds == 0 {
        return Err(AppError::Config("ai.timeout_seconds must be at least 1".into()));
    }

    // Email and password are both required; the display name is optional.
    let admin = match (&env.admin_email, &env.admin_password, &env.admin_name) {
        (Some(email), Some(password), Some(name)) => Some(AdminSeed {
            email: email.clone(),
            password: password.clone(),
            name: name.clone(),
        }),
        (Some(email), Some(password), None) => Some(AdminSeed {
            email: email.clone(),
            password: password.clone(),
            name: "Administrator".to_string(),
        }),
        _ => None,
    };

    Ok(Config {
        service_name: raw.service.name,
        log_level: env.log_level.clone().unwrap_or(raw.service.log_level),
        log_file: raw.service.log_file.map(PathBuf::from),
        server: ServerConfig {
            bind: env.bind.clone().unwrap_or(raw.server.bind),
        },
        database: DatabaseConfig {
            uri: env.mongodb_uri.clone(),
            db_name: env.db_name.clone().unwrap_or(raw.database.name),
            seed_content: raw.database.seed_content,
        },
        ai: AiConfig {
            gateway_url: raw.ai.gateway_url,
            openai_url: raw.ai.openai_url,
            gateway_model: raw.ai.gateway_model,
            openai_model: raw.ai.openai_model,
            temperature: raw.ai.temperature,
            timeout_seconds: raw.ai.timeout_seconds,
            prompts_dir: PathBuf::from(raw.ai.prompts_dir),
        },
        ai_credentials: AiCredentials {
            gateway_api_key: env.ai_gateway_api_key.clone(),
            vercel_oidc_token: env.vercel_oidc_token.clone(),
            openai_api_key: env.openai_api_key.clone(),
        },
        lex,
        admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overlays_nested_tables() {
        let base: toml::Value = toml::from_str("[ai]\ntimeout_seconds = 10\nopenai_model = \"a\"").unwrap();
        let overlay: toml::Value = toml::from_str("[ai]\nopenai_model = \"b\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["ai"]["timeout_seconds"].as_integer(), Some(10));
        assert_eq!(merged["ai"]["openai_model"].as_str(), Some("b"));
    }

    #[test]
    fn defaults_resolve_without_file() {
        let cfg = resolve(RawConfig::default(), &EnvOverrides::default()).unwrap();
        assert_eq!(cfg.database.db_name, "proacademics");
        assert_eq!(cfg.ai.timeout_seconds, 10);
        assert_eq!(cfg.lex.session_length, 20);
        assert!(cfg.database.uri.is_none());
        assert!(cfg.admin.is_none());
    }

    #[test]
    fn admin_seed_requires_email_and_password() {
        let env = EnvOverrides {
            admin_email: Some("admin@example.com".into()),
            ..Default::default()
        };
        let cfg = resolve(RawConfig::default(), &env).unwrap();
        assert!(cfg.admin.is_none());

        let env = EnvOverrides {
            admin_email: Some("admin@example.com".into()),
            admin_password: Some("s3cret-pass".into()),
            ..Default::default()
        };
        let cfg = resolve(RawConfig::default(), &env).unwrap();
        assert_eq!(cfg.admin.unwrap().name, "Administrator");
    }

    #[test]
    fn inverted_bands_rejected() {
        let mut raw = RawConfig::default();
        raw.lex.recent_band = 0.95;
        raw.lex.weak_band = 0.5;
        assert!(resolve(raw, &EnvOverrides::default()).is_err());
    }

    #[test]
    fn lex_windows_out_of_range_rejected() {
        let mut raw = RawConfig::default();
        raw.lex.recent_window_days = -1;
        assert!(resolve(raw, &EnvOverrides::default()).is_err());

        let mut raw = RawConfig::default();
        raw.lex.stale_after_days = i64::MAX;
        let err = resolve(raw, &EnvOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("lex.stale_after_days"));

        let mut raw = RawConfig::default();
        raw.lex.session_idle_minutes = i64::MAX;
        assert!(matches!(resolve(raw, &EnvOverrides::default()), Err(AppError::Config(_))));

        let mut raw = RawConfig::default();
        raw.lex.recent_window_days = MAX_WINDOW_DAYS;
        assert!(resolve(raw, &EnvOverrides::default()).is_ok());
    }
}
