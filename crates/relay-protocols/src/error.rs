//! Relay failure taxonomy.

use thiserror::Error;

/// Failures of discovery, the extension channel and request correlation.
///
/// `Clone` because a single channel loss fans out to every pending request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("No browser relay server found after probing {probes} candidates")]
    DiscoveryFailed { probes: usize },

    #[error("No active browser connection available")]
    ConnectionUnavailable,

    #[error(
        "{operation} timed out - no response from Chrome extension [{connection_id}] after {secs} seconds"
    )]
    RequestTimeout {
        operation: String,
        connection_id: String,
        secs: u64,
    },

    #[error("{0}")]
    Remote(String),

    #[error("Channel transport error: {0}")]
    Transport(String),

    #[error("{reason} [{connection_id}]")]
    ConnectionLost {
        connection_id: String,
        reason: String,
    },

    #[error("Too many pending requests (limit {0})")]
    TooManyPending(usize),

    #[error("Duplicate request id: {0}")]
    DuplicateRequestId(String),
}
