use relay_core::{RelayError, RelayResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Feature flags the chat endpoint expects on its query string.
const CHAT_QUERY: &str =
    "api-version=2&features=-,ncedge,edgepagecontext&setflight=-,ncedge,edgepagecontext&ncedge=1";

/// Largest accepted `timeout_secs`.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Where and how to reach the upstream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL for the conversation endpoint.
    #[serde(default = "default_http_base_url")]
    pub http_base_url: String,
    /// WebSocket chat endpoint, without query string.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// `Origin` header sent on both calls.
    #[serde(default = "default_origin")]
    pub origin: String,
    /// `User-Agent` header sent on both calls.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Deadline for the whole WebSocket exchange, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Optional access token appended to the chat URL.
    #[serde(default)]
    pub access_token: Option<String>,
}

fn default_http_base_url() -> String {
    "https://copilot.microsoft.com".to_string()
}

fn default_ws_url() -> String {
    "wss://copilot.microsoft.com/c/api/chat".to_string()
}

fn default_origin() -> String {
    "https://copilot.microsoft.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Linux; Android 15; SM-F958 Build/AP3A.240905.015) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/130.0.6723.86 Mobile Safari/537.36"
        .to_string()
}

// Stays under the 60s request ceiling of common serverless hosts.
fn default_timeout_secs() -> u64 {
    50
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            http_base_url: default_http_base_url(),
            ws_url: default_ws_url(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            access_token: None,
        }
    }
}

impl UpstreamConfig {
    /// Checks URLs and the deadline before anything is built from them.
    pub fn validate(&self) -> RelayResult<()> {
        if self.timeout_secs == 0 {
            return Err(RelayError::Config(
                "upstream.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(RelayError::Config(format!(
                "upstream.timeout_secs must be at most {MAX_TIMEOUT_SECS}, got {}",
                self.timeout_secs
            )));
        }

        let http = parse_url("upstream.http_base_url", &self.http_base_url)?;
        if !matches!(http.scheme(), "http" | "https") {
            return Err(RelayError::Config(format!(
                "upstream.http_base_url must use http or https, got '{}'",
                http.scheme()
            )));
        }

        let ws = parse_url("upstream.ws_url", &self.ws_url)?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(RelayError::Config(format!(
                "upstream.ws_url must use ws or wss, got '{}'",
                ws.scheme()
            )));
        }

        Ok(())
    }

    /// The deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the conversation-creation endpoint.
    pub fn conversation_url(&self) -> String {
        format!(
            "{}/c/api/conversations",
            self.http_base_url.trim_end_matches('/')
        )
    }

    /// Full chat URL including the feature flags and optional access token.
    pub fn chat_url(&self) -> RelayResult<String> {
        let mut url = parse_url("upstream.ws_url", &self.ws_url)?;
        url.set_query(Some(CHAT_QUERY));
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("accessToken", token);
        }
        Ok(url.to_string())
    }
}

fn parse_url(field: &str, raw: &str) -> RelayResult<Url> {
    Url::parse(raw).map_err(|e| RelayError::Config(format!("{field} '{raw}' is invalid: {e}")))
}
