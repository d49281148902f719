//! Runtime configuration resolved from the process environment.
//!
//! Every key is optional; defaults match a local development setup with an
//! Ollama backend on its standard port.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: String,
    pub production_safe_mode: bool,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub fs_allowed_path: PathBuf,
    pub servers_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub context_length: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but with an injectable lookup, so
    /// tests can supply their own environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let fs_allowed_path = lookup("FS_ALLOWED_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.clone());

        Self {
            port: parse_or(&lookup, "PORT", 4000),
            environment: lookup("NODE_ENV").unwrap_or_else(|| "development".to_string()),
            production_safe_mode: lookup("PRODUCTION_SAFE_MODE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            llm: LlmConfig {
                base_url: lookup("LLM_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                model: lookup("LLM_MODEL").unwrap_or_else(|| "llama3.1".to_string()),
                temperature: parse_or(&lookup, "LLM_TEMPERATURE", 0.1),
                context_length: parse_or(&lookup, "LLM_CONTEXT_LENGTH", 4096),
                timeout: Duration::from_millis(parse_or(&lookup, "LLM_TIMEOUT_MS", 60_000)),
            },
            database: DatabaseConfig {
                host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&lookup, "DB_PORT", 5432),
                user: lookup("DB_USER").unwrap_or_else(|| "postgres".to_string()),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                name: lookup("DB_NAME").unwrap_or_else(|| "agentd".to_string()),
            },
            cache: CacheConfig {
                host: lookup("REDIS_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&lookup, "REDIS_PORT", 6379),
                password: lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()),
                db: parse_or(&lookup, "REDIS_DB", 0),
            },
            fs_allowed_path,
            servers_file: cwd.join("mcp-servers.json"),
        }
    }

}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Demo token table mapping bearer tokens to roles. Absent or unknown
/// tokens fall back to readonly.
pub fn role_for_token(token: Option<&str>) -> crate::domain::types::Role {
    use crate::domain::types::Role;
    match token {
        Some("admin-token") => Role::Admin,
        Some("operator-token") => Role::Operator,
        Some("dev-token") => Role::Dev,
        _ => Role::Readonly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Role;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.port, 4000);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.llm.timeout, Duration::from_secs(60));
        assert!(!config.production_safe_mode);
    }

    #[test]
    fn environment_overrides_are_parsed() {
        let env = HashMap::from([
            ("PORT", "9000"),
            ("PRODUCTION_SAFE_MODE", "true"),
            ("LLM_TIMEOUT_MS", "1500"),
        ]);
        let config = AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.port, 9000);
        assert!(config.production_safe_mode);
        assert_eq!(config.llm.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(|key| {
            (key == "PORT").then(|| "not-a-number".to_string())
        });
        assert_eq!(config.port, 4000);
    }

    #[test]
    fn unknown_tokens_map_to_readonly() {
        assert_eq!(role_for_token(Some("admin-token")), Role::Admin);
        assert_eq!(role_for_token(Some("garbage")), Role::Readonly);
        assert_eq!(role_for_token(None), Role::Readonly);
    }
}
