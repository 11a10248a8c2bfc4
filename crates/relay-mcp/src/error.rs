//! Tool adapter errors.

use thiserror::Error;

/// A relay call failed. Any of these triggers one rediscovery and retry.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON from relay: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tool invocation failures that are not tool results.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = AdapterError::Status {
            status: 400,
            body: "Missing urlFilter".to_string(),
        };
        assert_eq!(err.to_string(), "Server returned 400: Missing urlFilter");
    }
}
