//! Relay configuration file.
//!
//! Every section and key is optional; an absent file means all defaults.

use relay_core::{RelayError, RelayResult};
use relay_upstream::UpstreamConfig;
use serde::Deserialize;
use std::path::Path;

/// Environment variable consulted when the file sets no access token.
pub const ACCESS_TOKEN_ENV: &str = "COPILOT_ACCESS_TOKEN";

#[derive(Debug, Deserialize, Default)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl RelayConfig {
    /// Parses a TOML document.
    pub fn from_toml(raw: &str) -> RelayResult<Self> {
        toml::from_str(raw).map_err(|e| RelayError::Config(format!("invalid config: {e}")))
    }

    /// Reads `path` if given, otherwise starts from defaults, then applies
    /// the environment and validates.
    pub async fn load(path: Option<&Path>) -> RelayResult<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    RelayError::Config(format!(
                        "Failed to read config file '{}': {e}",
                        path.display()
                    ))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };

        config.apply_access_token(std::env::var(ACCESS_TOKEN_ENV).ok());
        config.upstream.validate()?;
        Ok(config)
    }

    /// Fills the access token from `env_token` unless the file already set one.
    pub fn apply_access_token(&mut self, env_token: Option<String>) {
        if self.upstream.access_token.is_none() {
            self.upstream.access_token = env_token.filter(|t| !t.is_empty());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config = RelayConfig::from_toml("").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.timeout_secs, 50);
        assert_eq!(config.upstream.ws_url, "wss://copilot.microsoft.com/c/api/chat");
    }

    #[test]
    fn test_partial_sections() {
        let config = RelayConfig::from_toml(
            r#"
            [server]
            port = 8080

            [upstream]
            timeout_secs = 25
            access_token = "from-file"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upstream.timeout_secs, 25);
        assert_eq!(config.upstream.access_token.as_deref(), Some("from-file"));
        assert_eq!(config.upstream.http_base_url, "https://copilot.microsoft.com");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = RelayConfig::from_toml("[server\nport = ").unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn test_access_token_precedence() {
        let mut config = RelayConfig::default();
        config.apply_access_token(Some("from-env".into()));
        assert_eq!(config.upstream.access_token.as_deref(), Some("from-env"));

        let mut config =
            RelayConfig::from_toml("[upstream]\naccess_token = \"from-file\"").unwrap();
        config.apply_access_token(Some("from-env".into()));
        assert_eq!(config.upstream.access_token.as_deref(), Some("from-file"));

        let mut config = RelayConfig::default();
        config.apply_access_token(Some(String::new()));
        assert!(config.upstream.access_token.is_none());
    }

    #[tokio::test]
    async fn test_load_reads_and_validates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("relay.toml");
        tokio::fs::write(&path, "[upstream]\ntimeout_secs = 0\n").await.unwrap();

        let err = RelayConfig::load(Some(path.as_path())).await.unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));

        tokio::fs::write(&path, "[server]\nport = 4000\n").await.unwrap();
        let config = RelayConfig::load(Some(path.as_path())).await.unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        let err = RelayConfig::load(Some(path.as_path())).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
