use crate::config::UpstreamConfig;
use crate::conversation::header_value;
use crate::protocol::{InboundEvent, OutboundEvent};
use futures_util::{SinkExt, StreamExt};
use relay_core::{ChatResponse, ModelSelector, RelayError, RelayResult};
use reqwest::header::{HeaderValue, ORIGIN, USER_AGENT};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on the close handshake once the exchange is over.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Where a chat exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Opening the WebSocket.
    Connecting,
    /// Sending the options and the chat message.
    Negotiating,
    /// Reading events.
    Streaming,
    /// A `done` event arrived.
    Completed,
    /// The exchange ended with an error.
    Failed,
}

impl StreamPhase {
    /// Completed and Failed are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamPhase::Completed | StreamPhase::Failed)
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamPhase::Connecting => "connecting",
            StreamPhase::Negotiating => "negotiating",
            StreamPhase::Streaming => "streaming",
            StreamPhase::Completed => "completed",
            StreamPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the receive loop should do after an event.
#[derive(Debug)]
pub enum Step {
    /// Keep reading.
    Continue,
    /// Stop with the finished response.
    Complete(ChatResponse),
    /// Stop with an error.
    Fail(RelayError),
}

/// Folds streamed events into a [`ChatResponse`].
#[derive(Debug, Default)]
pub struct Aggregator {
    response: ChatResponse,
}

impl Aggregator {
    /// Applies one parsed event.
    pub fn apply(&mut self, event: InboundEvent) -> Step {
        match event {
            InboundEvent::AppendText(text) => {
                self.response.push_text(&text);
                Step::Continue
            }
            InboundEvent::Citation(citation) => {
                self.response.push_citation(citation);
                Step::Continue
            }
            InboundEvent::Done => Step::Complete(std::mem::take(&mut self.response)),
            InboundEvent::Error(message) => Step::Fail(RelayError::Upstream(message)),
            InboundEvent::Unknown(tag) => {
                trace!(event = ?tag, "Ignoring upstream event");
                Step::Continue
            }
        }
    }

    /// Parses and applies one raw payload. Unparseable payloads fail the exchange.
    pub fn apply_payload(&mut self, payload: &str) -> Step {
        match InboundEvent::parse(payload) {
            Ok(event) => self.apply(event),
            Err(e) => Step::Fail(e),
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.response.text
    }
}

/// Runs the WebSocket half of a chat turn.
pub struct ChatStream {
    url: String,
    origin: HeaderValue,
    user_agent: HeaderValue,
    timeout: Duration,
}

impl ChatStream {
    /// Builds a stream runner for the configured chat endpoint.
    pub fn new(config: &UpstreamConfig) -> RelayResult<Self> {
        Ok(Self {
            url: config.chat_url()?,
            origin: header_value("origin", &config.origin)?,
            user_agent: header_value("user_agent", &config.user_agent)?,
            timeout: config.timeout(),
        })
    }

    /// Overrides the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The deadline applied to each exchange.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `message` in `conversation_id` and waits for the full answer.
    ///
    /// One deadline covers connecting, negotiating and streaming. The socket
    /// is closed on every path once it has been opened.
    pub async fn run(
        &self,
        conversation_id: &str,
        model: ModelSelector,
        message: &str,
    ) -> RelayResult<ChatResponse> {
        let deadline = Instant::now().checked_add(self.timeout).ok_or_else(|| {
            RelayError::Config(format!("chat timeout {:?} is out of range", self.timeout))
        })?;

        let mut socket = timeout_at(deadline, self.connect())
            .await
            .map_err(|_| timed_out(StreamPhase::Connecting))??;

        let outcome = exchange(&mut socket, deadline, conversation_id, model, message).await;
        close(&mut socket).await;

        match &outcome {
            Ok(response) => info!(
                conversation_id,
                phase = %StreamPhase::Completed,
                text_len = response.text.len(),
                citations = response.citations.len(),
                "Upstream chat completed"
            ),
            Err(e) => warn!(
                conversation_id,
                phase = %StreamPhase::Failed,
                error = %e,
                "Upstream chat failed"
            ),
        }

        outcome
    }

    async fn connect(&self) -> RelayResult<UpstreamSocket> {
        debug!(phase = %StreamPhase::Connecting, url = %self.url, "Opening upstream WebSocket");

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| RelayError::Config(format!("invalid chat URL: {e}")))?;
        let headers = request.headers_mut();
        headers.insert(ORIGIN, self.origin.clone());
        headers.insert(USER_AGENT, self.user_agent.clone());

        let (socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RelayError::Transport(format!("chat connect failed: {e}")))?;

        Ok(socket)
    }
}

async fn exchange(
    socket: &mut UpstreamSocket,
    deadline: Instant,
    conversation_id: &str,
    model: ModelSelector,
    message: &str,
) -> RelayResult<ChatResponse> {
    timeout_at(deadline, negotiate(socket, conversation_id, model, message))
        .await
        .map_err(|_| timed_out(StreamPhase::Negotiating))??;

    timeout_at(deadline, receive(socket))
        .await
        .map_err(|_| timed_out(StreamPhase::Streaming))?
}

async fn negotiate(
    socket: &mut UpstreamSocket,
    conversation_id: &str,
    model: ModelSelector,
    message: &str,
) -> RelayResult<()> {
    debug!(phase = %StreamPhase::Negotiating, conversation_id, mode = model.upstream_mode(), "Sending chat");
    send_event(socket, &OutboundEvent::negotiation()).await?;
    send_event(socket, &OutboundEvent::chat(model, conversation_id, message)).await
}

async fn send_event(socket: &mut UpstreamSocket, event: &OutboundEvent) -> RelayResult<()> {
    socket
        .send(Message::Text(event.to_json()?))
        .await
        .map_err(|e| RelayError::Transport(format!("chat send failed: {e}")))
}

async fn receive(socket: &mut UpstreamSocket) -> RelayResult<ChatResponse> {
    debug!(phase = %StreamPhase::Streaming, "Waiting for upstream events");
    let mut aggregator = Aggregator::default();

    while let Some(frame) = socket.next().await {
        let frame = frame.map_err(|e| RelayError::Transport(format!("chat receive failed: {e}")))?;

        let payload = match frame {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8(bytes).map_err(|e| {
                RelayError::Protocol(format!("binary frame is not UTF-8: {e}"))
            })?,
            Message::Close(frame) => {
                let reason = frame.map(|f| f.reason.into_owned()).unwrap_or_default();
                return Err(RelayError::Transport(format!(
                    "upstream closed the connection before completion: {reason}"
                )));
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        match aggregator.apply_payload(&payload) {
            Step::Continue => {}
            Step::Complete(response) => return Ok(response),
            Step::Fail(e) => return Err(e),
        }
    }

    Err(RelayError::Transport(
        "upstream closed the connection before completion".into(),
    ))
}

async fn close(socket: &mut UpstreamSocket) {
    match timeout(CLOSE_GRACE, socket.close(None)).await {
        Ok(Ok(())) => debug!("Upstream WebSocket closed"),
        Ok(Err(e)) => debug!(error = %e, "Upstream WebSocket already closed"),
        Err(_) => debug!("Upstream WebSocket close handshake timed out"),
    }
}

fn timed_out(phase: StreamPhase) -> RelayError {
    warn!(phase = %phase, "Upstream chat timed out");
    RelayError::Timeout
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use relay_core::Citation;

    fn drive(aggregator: &mut Aggregator, payloads: &[&str]) -> Step {
        for payload in payloads {
            match aggregator.apply_payload(payload) {
                Step::Continue => continue,
                step => return step,
            }
        }
        Step::Continue
    }

    #[test]
    fn test_text_and_citations_in_arrival_order() {
        let mut aggregator = Aggregator::default();
        let step = drive(
            &mut aggregator,
            &[
                r#"{"event":"startMessage","messageId":"m1"}"#,
                r#"{"event":"appendText","text":"Rust is "}"#,
                r#"{"event":"citation","title":"Rust","iconUrl":"https://r/i.png","url":"https://r"}"#,
                r#"{"event":"appendText","text":"a systems language"}"#,
                r#"{"event":"appendText"}"#,
                r#"{"event":"citation","title":"Book","url":"https://b"}"#,
                r#"{"event":"appendText","text":"."}"#,
                r#"{"event":"done"}"#,
            ],
        );

        let Step::Complete(response) = step else {
            panic!("expected completion, got {step:?}");
        };
        assert_eq!(response.text, "Rust is a systems language.");
        assert_eq!(
            response.citations,
            vec![
                Citation {
                    title: Some("Rust".into()),
                    icon: Some("https://r/i.png".into()),
                    url: Some("https://r".into()),
                },
                Citation {
                    title: Some("Book".into()),
                    icon: None,
                    url: Some("https://b".into()),
                },
            ]
        );
    }

    #[test]
    fn test_error_event_discards_partial_text() {
        let mut aggregator = Aggregator::default();
        let step = drive(
            &mut aggregator,
            &[
                r#"{"event":"appendText","text":"partial"}"#,
                r#"{"event":"error","message":"Too many requests"}"#,
                r#"{"event":"done"}"#,
            ],
        );

        match step {
            Step::Fail(RelayError::Upstream(message)) => assert_eq!(message, "Too many requests"),
            other => panic!("expected upstream failure, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payload_fails() {
        let mut aggregator = Aggregator::default();
        let step = drive(
            &mut aggregator,
            &[r#"{"event":"appendText","text":"a"}"#, "{broken"],
        );
        assert!(matches!(step, Step::Fail(RelayError::Protocol(_))));
        assert_eq!(aggregator.text(), "a");
    }

    #[test]
    fn test_unknown_events_are_ignored() {
        let mut aggregator = Aggregator::default();
        let step = drive(
            &mut aggregator,
            &[
                r#"{"event":"received"}"#,
                r#"{"event":"suggestedFollowups","suggestions":["x"]}"#,
                r#"[1,2,3]"#,
            ],
        );
        assert!(matches!(step, Step::Continue));
        assert_eq!(aggregator.text(), "");
    }

    #[test]
    fn test_done_without_content_yields_empty_response() {
        let mut aggregator = Aggregator::default();
        let step = drive(&mut aggregator, &[r#"{"event":"done"}"#]);
        let Step::Complete(response) = step else {
            panic!("expected completion");
        };
        assert_eq!(response, ChatResponse::default());
    }

    #[test]
    fn test_phase_terminality() {
        assert!(!StreamPhase::Connecting.is_terminal());
        assert!(!StreamPhase::Negotiating.is_terminal());
        assert!(!StreamPhase::Streaming.is_terminal());
        assert!(StreamPhase::Completed.is_terminal());
        assert!(StreamPhase::Failed.is_terminal());
        assert_eq!(StreamPhase::Streaming.to_string(), "streaming");
    }

    #[test]
    fn test_with_timeout_overrides_config() {
        let stream = ChatStream::new(&UpstreamConfig::default())
            .unwrap()
            .with_timeout(Duration::from_millis(250));
        assert_eq!(stream.timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_unrepresentable_deadline_is_config_error() {
        let config = UpstreamConfig {
            ws_url: "ws://127.0.0.1:1/c/api/chat".into(),
            timeout_secs: u64::MAX,
            ..Default::default()
        };
        let stream = ChatStream::new(&config).unwrap();
        let err = stream
            .run("conv-1", ModelSelector::Default, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)), "got {err:?}");
    }
}
