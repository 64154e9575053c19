use thiserror::Error;

/// A convenience `Result` alias using [`RelayError`].
pub type RelayResult<T> = Result<T, RelayError>;

/// Top-level error type for the relay.
///
/// `InvalidInput` is the only variant caused by the caller; everything else
/// is a server-side failure.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The inbound request was missing or carried an invalid field.
    #[error("{0}")]
    InvalidInput(String),

    /// A connection-level failure on an outbound call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The upstream sent a payload that could not be parsed.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The upstream reported an error. The message is passed through verbatim.
    #[error("{0}")]
    Upstream(String),

    /// No terminal event arrived before the deadline.
    #[error("Request timeout")]
    Timeout,

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Returns true if the caller, not the relay or the upstream, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::InvalidInput(_))
    }
}
