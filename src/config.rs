//! TOML configuration parsing and validation.

use anyhow::{Context, Result};
use lessonlens_core::search::SearchParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Minimum length of the token signing secret, in bytes.
const MIN_SECRET_BYTES: usize = 16;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC key used to sign and verify bearer tokens.
    pub token_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
    #[serde(default = "default_min_token_chars")]
    pub min_token_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            snippet_chars: default_snippet_chars(),
            min_token_chars: default_min_token_chars(),
        }
    }
}

fn default_result_limit() -> usize {
    SearchParams::default().result_limit
}
fn default_snippet_chars() -> usize {
    SearchParams::default().snippet_chars
}
fn default_min_token_chars() -> usize {
    SearchParams::default().min_token_chars
}

impl SearchConfig {
    pub fn params(&self) -> SearchParams {
        SearchParams {
            result_limit: self.result_limit,
            snippet_chars: self.snippet_chars,
            min_token_chars: self.min_token_chars,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config")?;

    if config.search.result_limit < 1 {
        anyhow::bail!("search.result_limit must be >= 1");
    }
    if config.search.snippet_chars < 1 {
        anyhow::bail!("search.snippet_chars must be >= 1");
    }
    if config.search.min_token_chars < 1 {
        anyhow::bail!("search.min_token_chars must be >= 1");
    }

    if config.auth.token_secret.len() < MIN_SECRET_BYTES {
        anyhow::bail!(
            "auth.token_secret must be at least {} bytes",
            MIN_SECRET_BYTES
        );
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[db]
path = "./data/lens.sqlite"

[server]
bind = "127.0.0.1:7341"

[auth]
token_secret = "0123456789abcdef0123"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.search.params(), SearchParams::default());
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.db.path, PathBuf::from("./data/lens.sqlite"));
    }

    #[test]
    fn test_search_overrides() {
        let content = format!("{}\n[search]\nresult_limit = 10\n", MINIMAL);
        let config = parse_config(&content).unwrap();
        assert_eq!(config.search.result_limit, 10);
        assert_eq!(config.search.snippet_chars, 500);
    }

    #[test]
    fn test_rejects_short_secret() {
        let content = MINIMAL.replace("0123456789abcdef0123", "short");
        let err = parse_config(&content).unwrap_err();
        assert!(err.to_string().contains("token_secret"));
    }

    #[test]
    fn test_rejects_zero_limit() {
        let content = format!("{}\n[search]\nresult_limit = 0\n", MINIMAL);
        assert!(parse_config(&content).is_err());
    }

    #[test]
    fn test_missing_auth_section() {
        let content = MINIMAL.replace("[auth]\ntoken_secret = \"0123456789abcdef0123\"\n", "");
        assert!(parse_config(&content).is_err());
    }
}
