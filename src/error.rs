use thiserror::Error;

/// Errors raised by the Kraken REST and streaming clients
#[derive(Error, Debug)]
pub enum KrakenError {
    /// The stored API secret is not valid base64
    #[error("invalid API secret: {0}")]
    InvalidSecret(String),

    /// Transport, DNS or timeout failure on a REST call
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The exchange answered with a non-empty `error` array
    #[error("exchange rejected request: {}", .0.join(", "))]
    Auth(Vec<String>),

    /// The stream ended (remote close or transport failure)
    #[error("stream connection closed: {0}")]
    ConnectionClosed(String),

    /// A stream frame could not be parsed
    #[error("malformed stream message: {0}")]
    MalformedMessage(String),

    /// The exchange refused the stream subscription
    #[error("subscription rejected: {0}")]
    Subscription(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A credential cannot be carried in an HTTP header
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("unknown API method: {0}")]
    UnknownMethod(String),
}

impl KrakenError {
    /// Whether the caller may reasonably retry. The client itself never does.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KrakenError::Network(_) | KrakenError::ConnectionClosed(_) | KrakenError::WebSocket(_)
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, KrakenError::Auth(_) | KrakenError::InvalidSecret(_))
    }
}

pub type Result<T> = std::result::Result<T, KrakenError>;
