use relay_core::{Citation, ModelSelector, RelayError, RelayResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SUPPORTED_FEATURES: &[&str] = &["partial-generated-images"];

const SUPPORTED_CARDS: &[&str] = &[
    "weather",
    "local",
    "image",
    "sports",
    "video",
    "ads",
    "safetyHelpline",
    "quiz",
    "finance",
    "recipe",
];

const SUPPORTED_AD_TYPES: &[&str] = &[
    "text",
    "product",
    "multimedia",
    "tourActivity",
    "propertyPromotion",
];

/// Messages the relay sends over the chat WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// Capability negotiation, always the first frame.
    #[serde(rename_all = "camelCase")]
    SetOptions {
        /// Optional response features the client can render.
        supported_features: &'static [&'static str],
        /// Rich card kinds the client can render.
        supported_cards: &'static [&'static str],
        /// Ad formats the client can render.
        ads: AdOptions,
    },
    /// The user's message.
    #[serde(rename_all = "camelCase")]
    Send {
        /// Upstream processing mode.
        mode: &'static str,
        /// Conversation the message belongs to.
        conversation_id: String,
        /// Message parts.
        content: Vec<ContentPart>,
        /// Page context; always empty.
        context: serde_json::Map<String, Value>,
    },
}

/// Ad capabilities advertised in [`OutboundEvent::SetOptions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdOptions {
    /// Ad formats the client can render.
    pub supported_types: &'static [&'static str],
}

/// One part of a chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },
}

impl OutboundEvent {
    /// The fixed capability negotiation frame.
    pub fn negotiation() -> Self {
        OutboundEvent::SetOptions {
            supported_features: SUPPORTED_FEATURES,
            supported_cards: SUPPORTED_CARDS,
            ads: AdOptions {
                supported_types: SUPPORTED_AD_TYPES,
            },
        }
    }

    /// A chat message bound to a conversation.
    pub fn chat(model: ModelSelector, conversation_id: &str, text: &str) -> Self {
        OutboundEvent::Send {
            mode: model.upstream_mode(),
            conversation_id: conversation_id.to_string(),
            content: vec![ContentPart::Text {
                text: text.to_string(),
            }],
            context: serde_json::Map::new(),
        }
    }

    /// Serializes the event into a WebSocket text payload.
    pub fn to_json(&self) -> RelayResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Events received from the chat WebSocket, classified by their `event` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `appendText`: an incremental piece of the answer.
    AppendText(String),
    /// `citation`: a reference attached to the answer.
    Citation(Citation),
    /// `done`: the answer is complete.
    Done,
    /// `error`: the upstream gave up.
    Error(String),
    /// Any other tag, or none at all.
    Unknown(Option<String>),
}

#[derive(Deserialize)]
struct AppendTextFrame {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationFrame {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    icon_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorFrame {
    #[serde(default)]
    message: Option<String>,
}

impl InboundEvent {
    /// Parses one WebSocket payload.
    ///
    /// Fails with [`RelayError::Protocol`] when the payload is not JSON or a
    /// known event carries fields of the wrong type. Unknown tags are not an
    /// error.
    pub fn parse(payload: &str) -> RelayResult<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| RelayError::Protocol(format!("invalid JSON from upstream: {e}")))?;

        let tag = value.get("event").and_then(Value::as_str).map(str::to_owned);

        let event = match tag.as_deref() {
            Some("appendText") => {
                let frame: AppendTextFrame = decode("appendText", value)?;
                InboundEvent::AppendText(frame.text.unwrap_or_default())
            }
            Some("citation") => {
                let frame: CitationFrame = decode("citation", value)?;
                InboundEvent::Citation(Citation {
                    title: frame.title,
                    icon: frame.icon_url,
                    url: frame.url,
                })
            }
            Some("done") => InboundEvent::Done,
            Some("error") => {
                let frame: ErrorFrame = decode("error", value)?;
                InboundEvent::Error(
                    frame
                        .message
                        .unwrap_or_else(|| "Upstream reported an error".to_string()),
                )
            }
            _ => InboundEvent::Unknown(tag),
        };

        Ok(event)
    }
}

fn decode<T: DeserializeOwned>(tag: &str, value: Value) -> RelayResult<T> {
    serde_json::from_value(value)
        .map_err(|e| RelayError::Protocol(format!("malformed '{tag}' event: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negotiation_frame_shape() {
        let frame = OutboundEvent::negotiation().to_json().unwrap();
        let json: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            json,
            json!({
                "event": "setOptions",
                "supportedFeatures": ["partial-generated-images"],
                "supportedCards": [
                    "weather", "local", "image", "sports", "video", "ads",
                    "safetyHelpline", "quiz", "finance", "recipe"
                ],
                "ads": {
                    "supportedTypes": ["text", "product", "multimedia", "tourActivity", "propertyPromotion"]
                }
            })
        );
    }

    #[test]
    fn test_chat_frame_shape() {
        let event = OutboundEvent::chat(ModelSelector::Gpt5, "conv-1", "hello");
        let json: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({
                "event": "send",
                "mode": "smart",
                "conversationId": "conv-1",
                "content": [{"type": "text", "text": "hello"}],
                "context": {}
            })
        );
    }

    #[test]
    fn test_parse_append_text() {
        let event =
            InboundEvent::parse(r#"{"event":"appendText","text":"Hi","messageId":"m1"}"#).unwrap();
        assert_eq!(event, InboundEvent::AppendText("Hi".into()));
    }

    #[test]
    fn test_parse_append_text_without_text() {
        let event = InboundEvent::parse(r#"{"event":"appendText"}"#).unwrap();
        assert_eq!(event, InboundEvent::AppendText(String::new()));

        let event = InboundEvent::parse(r#"{"event":"appendText","text":null}"#).unwrap();
        assert_eq!(event, InboundEvent::AppendText(String::new()));
    }

    #[test]
    fn test_parse_citation_maps_icon_url() {
        let event = InboundEvent::parse(
            r#"{"event":"citation","title":"Docs","iconUrl":"https://x/icon.png","url":"https://x"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::Citation(Citation {
                title: Some("Docs".into()),
                icon: Some("https://x/icon.png".into()),
                url: Some("https://x".into()),
            })
        );
    }

    #[test]
    fn test_parse_done_and_error() {
        assert_eq!(InboundEvent::parse(r#"{"event":"done"}"#).unwrap(), InboundEvent::Done);
        assert_eq!(
            InboundEvent::parse(r#"{"event":"error","message":"Throttled"}"#).unwrap(),
            InboundEvent::Error("Throttled".into())
        );
    }

    #[test]
    fn test_parse_unknown_and_missing_tags() {
        assert_eq!(
            InboundEvent::parse(r#"{"event":"startMessage","messageId":"m1"}"#).unwrap(),
            InboundEvent::Unknown(Some("startMessage".into()))
        );
        assert_eq!(
            InboundEvent::parse(r#"{"type":"ping"}"#).unwrap(),
            InboundEvent::Unknown(None)
        );
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = InboundEvent::parse("not json").unwrap_err();
        assert!(matches!(err, RelayError::Protocol(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_field_type() {
        let err = InboundEvent::parse(r#"{"event":"appendText","text":42}"#).unwrap_err();
        assert!(matches!(err, RelayError::Protocol(_)));
        assert!(err.to_string().contains("appendText"));
    }
}
