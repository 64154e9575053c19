//! Client side of the relay: talks to the Copilot web service.
//!
//! A chat turn is two steps. [`ConversationClient`] obtains a conversation id
//! over HTTP, then [`ChatStream`] opens a WebSocket, negotiates options, sends
//! the user's message and folds the streamed events into a
//! [`relay_core::ChatResponse`].
//!
//! # Main types
//!
//! - [`ChatBackend`] — Trait the gateway calls to run one chat turn.
//! - [`CopilotClient`] — The production [`ChatBackend`].
//! - [`UpstreamConfig`] — Endpoints, browser headers and the deadline.
//! - [`Aggregator`] — Pure event folding, independent of any socket.

/// Chat backend trait and the Copilot implementation.
pub mod client;
/// Upstream endpoint configuration.
pub mod config;
/// Conversation creation (session initiator).
pub mod conversation;
/// Wire messages exchanged with the upstream.
pub mod protocol;
/// WebSocket exchange and event aggregation.
pub mod stream;

pub use client::{ChatBackend, CopilotClient};
pub use config::{UpstreamConfig, MAX_TIMEOUT_SECS};
pub use conversation::{Conversation, ConversationClient};
pub use protocol::{InboundEvent, OutboundEvent};
pub use stream::{Aggregator, ChatStream, Step, StreamPhase};
