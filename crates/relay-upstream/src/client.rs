use crate::config::UpstreamConfig;
use crate::conversation::{Conversation, ConversationClient};
use crate::stream::ChatStream;
use async_trait::async_trait;
use relay_core::{ChatResponse, ModelSelector, RelayResult};
use std::time::Duration;
use tracing::info;

/// Runs one chat turn and returns the aggregated answer.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends `message` using `model` and waits for the complete response.
    async fn chat(&self, message: &str, model: ModelSelector) -> RelayResult<ChatResponse>;
}

/// [`ChatBackend`] backed by the Copilot web service.
///
/// Holds only immutable settings; every call creates its own conversation and
/// its own WebSocket.
pub struct CopilotClient {
    conversations: ConversationClient,
    stream: ChatStream,
}

impl CopilotClient {
    /// Validates `config` and builds the client.
    pub fn new(config: &UpstreamConfig) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            conversations: ConversationClient::new(config)?,
            stream: ChatStream::new(config)?,
        })
    }

    /// Overrides the deadline of both the conversation request and the
    /// WebSocket exchange.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            conversations: self.conversations.with_timeout(timeout),
            stream: self.stream.with_timeout(timeout),
        }
    }
}

#[async_trait]
impl ChatBackend for CopilotClient {
    async fn chat(&self, message: &str, model: ModelSelector) -> RelayResult<ChatResponse> {
        let mut conversation = Conversation::new(&self.conversations);
        let conversation_id = conversation.ensure_id().await?;

        info!(
            conversation_id,
            model = %model,
            mode = model.upstream_mode(),
            "Starting upstream chat"
        );

        self.stream.run(conversation_id, model, message).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use relay_core::RelayError;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = UpstreamConfig {
            ws_url: "not a url".into(),
            ..Default::default()
        };
        let err = CopilotClient::new(&config).err().unwrap();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_transport_error() {
        let config = UpstreamConfig {
            http_base_url: "http://127.0.0.1:1".into(),
            ws_url: "ws://127.0.0.1:1/c/api/chat".into(),
            ..Default::default()
        };
        let client = CopilotClient::new(&config).unwrap();
        let err = client.chat("hello", ModelSelector::Default).await.unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)), "got {err:?}");
    }
}
