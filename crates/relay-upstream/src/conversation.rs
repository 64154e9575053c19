use crate::config::UpstreamConfig;
use relay_core::{RelayError, RelayResult};
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Creates conversations on the upstream service.
pub struct ConversationClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ConversationClient {
    /// Builds a client for the configured conversation endpoint.
    ///
    /// Idle connections are not pooled: every relay request stands alone.
    pub fn new(config: &UpstreamConfig) -> RelayResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, header_value("origin", &config.origin)?);
        headers.insert(USER_AGENT, header_value("user_agent", &config.user_agent)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: config.conversation_url(),
            timeout: config.timeout(),
        })
    }

    /// Overrides the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Asks the upstream for a fresh conversation and returns its id.
    pub async fn create_conversation(&self) -> RelayResult<String> {
        debug!(url = %self.url, "Creating upstream conversation");

        let resp = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error("conversation request failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Upstream(format!(
                "conversation request failed with status {status}"
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| request_error("conversation response read failed", e))?;

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            RelayError::Protocol(format!("conversation response is not JSON: {e}"))
        })?;

        let id = value
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                RelayError::Upstream("conversation response did not include an id".into())
            })?;

        info!(conversation_id = %id, "Upstream conversation created");
        Ok(id.to_string())
    }
}

/// A conversation that lives for exactly one relay request.
///
/// The id is requested from the upstream the first time it is needed.
pub struct Conversation<'a> {
    client: &'a ConversationClient,
    id: Option<String>,
}

impl<'a> Conversation<'a> {
    /// A conversation with no id yet.
    pub fn new(client: &'a ConversationClient) -> Self {
        Self { client, id: None }
    }

    /// The id, if one has been obtained.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the id, creating the conversation upstream if necessary.
    pub async fn ensure_id(&mut self) -> RelayResult<&str> {
        if self.id.is_none() {
            self.id = Some(self.client.create_conversation().await?);
        }
        Ok(self.id.as_deref().unwrap_or_default())
    }
}

fn request_error(context: &str, e: reqwest::Error) -> RelayError {
    if e.is_timeout() {
        warn!(error = %e, "Conversation request timed out");
        RelayError::Timeout
    } else {
        RelayError::Transport(format!("{context}: {e}"))
    }
}

pub(crate) fn header_value(field: &str, raw: &str) -> RelayResult<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|e| RelayError::Config(format!("upstream.{field} is not a valid header: {e}")))
}
