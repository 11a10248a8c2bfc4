//! Link error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    /// `/.identity` could not be fetched or parsed.
    #[error("Identity check failed at {url}: {reason}")]
    Identity { url: String, reason: String },

    /// Something answered, but not a relay.
    #[error("Service at {0} is not a browser relay")]
    NotRelay(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Link closed")]
    Closed,

    #[error("Gave up after {attempts} connection attempts: {last}")]
    ReconnectExhausted { attempts: u32, last: String },
}

impl From<tokio_tungstenite::tungstenite::Error> for LinkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}
