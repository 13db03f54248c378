use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::errors::AppError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LANGFUSE_HOST: &str = "http://localhost:3000";
const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

/// Ports tried in order when `PORT` is not set.
pub const FALLBACK_PORTS: [u16; 8] = [8081, 8082, 8083, 8084, 8085, 9000, 9001, 9002];

/// Application configuration loaded from environment variables.
/// The model credential is optional here; components that need it check at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub langfuse: LangfuseConfig,
    pub contracts_dir: PathBuf,
    pub bind_host: String,
    pub port: Option<u16>,
    pub rust_log: String,
}

/// Credentials and host of the tracing service.
#[derive(Debug, Clone)]
pub struct LangfuseConfig {
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub host: String,
}

impl LangfuseConfig {
    /// Returns the key pair when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.public_key.as_deref(), self.secret_key.as_deref()) {
            (Some(public), Some(secret)) => Some((public, secret)),
            _ => None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            langfuse: LangfuseConfig {
                public_key: optional_env("LANGFUSE_PUBLIC_KEY"),
                secret_key: optional_env("LANGFUSE_SECRET_KEY"),
                host: optional_env("LANGFUSE_HOST")
                    .unwrap_or_else(|| DEFAULT_LANGFUSE_HOST.to_string()),
            },
            contracts_dir: optional_env("CONTRACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("contracts")),
            bind_host: optional_env("BIND_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: optional_env("PORT")
                .map(|p| p.parse::<u16>())
                .transpose()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Returns the model API key, rejecting a missing value or the `.env.example` placeholder.
    pub fn require_openai_key(&self) -> Result<&str, AppError> {
        match self.openai_api_key.as_deref() {
            Some(key) if key != PLACEHOLDER_API_KEY => Ok(key),
            _ => Err(AppError::Configuration(
                "OPENAI_API_KEY環境変数を設定してください。".to_string(),
            )),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) fn test_config(contracts_dir: PathBuf, base_url: &str) -> Config {
    Config {
        openai_api_key: Some("sk-test".to_string()),
        openai_base_url: base_url.to_string(),
        langfuse: LangfuseConfig {
            public_key: None,
            secret_key: None,
            host: DEFAULT_LANGFUSE_HOST.to_string(),
        },
        contracts_dir,
        bind_host: "127.0.0.1".to_string(),
        port: None,
        rust_log: "info".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_openai_key_rejects_missing_key() {
        let mut config = test_config(PathBuf::from("contracts"), DEFAULT_OPENAI_BASE_URL);
        config.openai_api_key = None;
        assert!(matches!(
            config.require_openai_key(),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_require_openai_key_rejects_placeholder() {
        let mut config = test_config(PathBuf::from("contracts"), DEFAULT_OPENAI_BASE_URL);
        config.openai_api_key = Some(PLACEHOLDER_API_KEY.to_string());
        assert!(config.require_openai_key().is_err());
    }

    #[test]
    fn test_require_openai_key_accepts_real_key() {
        let config = test_config(PathBuf::from("contracts"), DEFAULT_OPENAI_BASE_URL);
        assert_eq!(config.require_openai_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_langfuse_credentials_need_both_keys() {
        let mut langfuse = LangfuseConfig {
            public_key: Some("pk-lf".to_string()),
            secret_key: None,
            host: DEFAULT_LANGFUSE_HOST.to_string(),
        };
        assert!(langfuse.credentials().is_none());

        langfuse.secret_key = Some("sk-lf".to_string());
        assert_eq!(langfuse.credentials(), Some(("pk-lf", "sk-lf")));
    }
}
