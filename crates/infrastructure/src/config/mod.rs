//! Application configuration
//!
//! Defaults, then an optional `config` file, then `PARLEY_`-prefixed
//! environment variables, each layer overriding the last.

mod server;

use std::fmt;
use std::path::PathBuf;

use ai_core::UpstreamConfig;
use serde::{Deserialize, Serialize};

pub use server::ServerConfig;

/// Application environment (development or production)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment - relaxed CORS, readable logs
    #[default]
    Development,
    /// Production environment - strict origins expected
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream chat-completions client settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Fallback dotenv file scanned for the API key when no environment
    /// variable carries one
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("../.env")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            credentials_file: default_credentials_file(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional file
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("PARLEY")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        // Missing keys fall back through serde defaults.
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_setup() {
        let config = AppConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.upstream.timeout_ms, 30_000);
        assert_eq!(config.credentials_file, PathBuf::from("../.env"));
    }

    #[test]
    fn deserializes_from_empty_document() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upstream.retry_attempts, 2);
    }

    #[test]
    fn environment_renders_lowercase() {
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
