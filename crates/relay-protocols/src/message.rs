//! Frames exchanged on the `/extension-ws` channel.
//!
//! Both directions are JSON objects discriminated by a `type` field. Field
//! names on the wire are camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::StorageType;

/// Messages sent by the relay to the browser extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Capture the visible tab and answer with `screenshot-data`.
    #[serde(rename = "take-screenshot")]
    TakeScreenshot { request_id: String },

    /// Liveness probe; the extension echoes `heartbeat-response`.
    #[serde(rename = "heartbeat")]
    Heartbeat { connection_id: String, timestamp: i64 },

    /// Read an auth token from the given origin's storage.
    #[serde(rename = "RETRIEVE_AUTH_TOKEN")]
    RetrieveAuthToken {
        request_id: String,
        origin: String,
        storage_type: StorageType,
        token_key: String,
    },

    /// The relay is going away; the extension should stop reconnecting eagerly.
    #[serde(rename = "server-shutdown")]
    ServerShutdown,
}

impl ServerMessage {
    /// Heartbeat stamped with the current wall-clock time.
    pub fn heartbeat(connection_id: impl Into<String>) -> Self {
        Self::Heartbeat {
            connection_id: connection_id.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Correlation id carried by this message, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::TakeScreenshot { request_id } | Self::RetrieveAuthToken { request_id, .. } => {
                Some(request_id)
            }
            Self::Heartbeat { .. } | Self::ServerShutdown => None,
        }
    }
}

/// Messages sent by the browser extension to the relay.
///
/// `requestId` is optional on every reply: older extensions omit it and rely
/// on the relay matching the oldest outstanding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ExtensionMessage {
    #[serde(rename = "screenshot-data")]
    ScreenshotData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(default)]
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default)]
        auto_paste: bool,
    },

    #[serde(rename = "screenshot-error")]
    ScreenshotError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "heartbeat-response")]
    HeartbeatResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connection_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    #[serde(rename = "RETRIEVE_AUTH_TOKEN_RESPONSE")]
    AuthTokenResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "current-url-response")]
    CurrentUrlResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<Value>,
    },

    #[serde(rename = "page-navigated")]
    PageNavigated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<Value>,
    },

    /// Any other `type`; logged and ignored.
    #[serde(other)]
    Unknown,
}

impl ExtensionMessage {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::ScreenshotData { request_id, .. }
            | Self::ScreenshotError { request_id, .. }
            | Self::AuthTokenResponse { request_id, .. }
            | Self::CurrentUrlResponse { request_id, .. } => request_id.as_deref(),
            Self::HeartbeatResponse { .. } | Self::PageNavigated { .. } | Self::Unknown => None,
        }
    }

    /// Wire name of the message type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScreenshotData { .. } => "screenshot-data",
            Self::ScreenshotError { .. } => "screenshot-error",
            Self::HeartbeatResponse { .. } => "heartbeat-response",
            Self::AuthTokenResponse { .. } => "RETRIEVE_AUTH_TOKEN_RESPONSE",
            Self::CurrentUrlResponse { .. } => "current-url-response",
            Self::PageNavigated { .. } => "page-navigated",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
