//! Extension bridge.
//!
//! Owns the connection registry and the request correlator and is the only
//! place where the two interact: attaching and tearing down connections,
//! dispatching inbound frames, and sending correlated requests.

use std::sync::Arc;

use parking_lot::RwLock;
use relay_config::ChannelConfig;
use relay_protocols::{ExtensionMessage, RelayError, ServerMessage, TokenRequest};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use super::correlator::{Correlator, ReplyKind, Resolution};
use super::heartbeat::{HeartbeatTick, spawn_monitor};
use super::registry::{
    CLOSE_GOING_AWAY, CLOSE_NORMAL, ConnectionRegistry, ConnectionSnapshot, Outbound,
};

/// A request the relay can ask the extension to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayRequest {
    CaptureScreenshot,
    RetrieveAuthToken(TokenRequest),
}

impl RelayRequest {
    fn reply_kind(&self) -> ReplyKind {
        match self {
            Self::CaptureScreenshot => ReplyKind::Screenshot,
            Self::RetrieveAuthToken(_) => ReplyKind::AuthToken,
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::CaptureScreenshot => "Screenshot capture",
            Self::RetrieveAuthToken(_) => "Auth token retrieval",
        }
    }

    fn into_message(self, request_id: String) -> ServerMessage {
        match self {
            Self::CaptureScreenshot => ServerMessage::TakeScreenshot { request_id },
            Self::RetrieveAuthToken(token) => ServerMessage::RetrieveAuthToken {
                request_id,
                origin: token.origin,
                storage_type: token.storage_type,
                token_key: token.token_key,
            },
        }
    }
}

/// Page the extension last reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub url: Option<String>,
    pub tab_id: Option<Value>,
}

/// Relay-side endpoint of the extension channel.
pub struct ExtensionBridge {
    registry: ConnectionRegistry,
    correlator: Correlator,
    config: ChannelConfig,
    page: RwLock<PageInfo>,
}

impl ExtensionBridge {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            correlator: Correlator::new(config.max_pending_requests),
            config,
            page: RwLock::new(PageInfo::default()),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Install a new extension connection and start its heartbeat monitor.
    ///
    /// Returns the connection id assigned to it.
    pub fn attach(self: &Arc<Self>, sender: mpsc::Sender<Outbound>) -> String {
        let attached = self.registry.attach(sender);
        spawn_monitor(
            self.clone(),
            attached.connection_id.clone(),
            attached.monitor,
            self.config.heartbeat_interval(),
        );
        attached.connection_id
    }

    /// Tear down `connection_id` after its socket closed.
    ///
    /// Fails every pending request when it was the active connection.
    pub fn detach(&self, connection_id: &str) -> bool {
        if !self.registry.detach(connection_id) {
            return false;
        }
        self.correlator.reject_all(RelayError::ConnectionLost {
            connection_id: connection_id.to_string(),
            reason: "WebSocket connection lost".to_string(),
        });
        true
    }

    pub fn has_active_connection(&self) -> bool {
        self.registry.has_active_connection()
    }

    pub fn active_connection_id(&self) -> Option<String> {
        self.registry.active_id()
    }

    pub fn connection_snapshot(&self) -> Option<ConnectionSnapshot> {
        self.registry.snapshot()
    }

    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    /// One heartbeat monitor step for `connection_id`.
    pub fn heartbeat_tick(&self, connection_id: &str) -> HeartbeatTick {
        let Some(elapsed) = self.registry.since_heartbeat(connection_id) else {
            return HeartbeatTick::Stop;
        };

        if elapsed > self.config.heartbeat_timeout() {
            warn!(
                "Heartbeat timeout for {} ({:?} since last response)",
                connection_id, elapsed
            );
            self.correlator.reject_all(RelayError::ConnectionLost {
                connection_id: connection_id.to_string(),
                reason: "Connection timeout - heartbeat failed".to_string(),
            });
            self.registry
                .close(connection_id, CLOSE_GOING_AWAY, "Heartbeat timeout");
            return HeartbeatTick::Stop;
        }

        if self
            .registry
            .try_send_to(connection_id, ServerMessage::heartbeat(connection_id))
        {
            debug!("Heartbeat sent to {}", connection_id);
            HeartbeatTick::Sent
        } else {
            warn!("Failed to send heartbeat to {}", connection_id);
            self.detach(connection_id);
            HeartbeatTick::Stop
        }
    }

    /// Parse and dispatch one text frame received on `connection_id`.
    pub fn handle_frame(&self, connection_id: &str, text: &str) {
        match serde_json::from_str::<ExtensionMessage>(text) {
            Ok(message) => self.handle_message(connection_id, message),
            Err(e) => warn!("Ignoring malformed frame from {}: {}", connection_id, e),
        }
    }

    pub fn handle_message(&self, connection_id: &str, message: ExtensionMessage) {
        debug!("Received {} from {}", message.kind(), connection_id);
        match message {
            ExtensionMessage::HeartbeatResponse { .. } => {
                if !self.registry.touch(connection_id) {
                    debug!("Heartbeat response from inactive connection {}", connection_id);
                }
            }
            ExtensionMessage::ScreenshotData {
                request_id,
                data,
                path,
                auto_paste,
            } => {
                let payload = json!({ "data": data, "path": path, "autoPaste": auto_paste });
                self.complete(request_id.as_deref(), ReplyKind::Screenshot, Ok(payload));
            }
            ExtensionMessage::ScreenshotError { request_id, error } => {
                let message = error.unwrap_or_else(|| "Screenshot capture failed".to_string());
                self.complete(
                    request_id.as_deref(),
                    ReplyKind::Screenshot,
                    Err(RelayError::Remote(message)),
                );
            }
            ExtensionMessage::AuthTokenResponse {
                request_id,
                token,
                error,
            } => {
                let outcome = match (token, error) {
                    (_, Some(error)) => Err(RelayError::Remote(error)),
                    (Some(token), None) if !token.is_empty() => Ok(Value::String(token)),
                    _ => Err(RelayError::Remote("No token found".to_string())),
                };
                self.complete(request_id.as_deref(), ReplyKind::AuthToken, outcome);
            }
            ExtensionMessage::CurrentUrlResponse { url, tab_id, .. }
            | ExtensionMessage::PageNavigated { url, tab_id } => {
                if let Some(url) = url {
                    self.set_page(url, tab_id);
                }
            }
            ExtensionMessage::Unknown => {
                debug!("Ignoring unknown message type from {}", connection_id);
            }
        }
    }

    fn complete(
        &self,
        request_id: Option<&str>,
        kind: ReplyKind,
        outcome: Result<Value, RelayError>,
    ) {
        match self.correlator.resolve(request_id, kind, outcome) {
            Resolution::Matched(id) => debug!("Resolved request {}", id),
            Resolution::Fallback(id) => {
                info!("Reply without requestId matched oldest pending request {}", id)
            }
            Resolution::Unknown(id) => warn!("Dropping reply for unknown request {}", id),
            Resolution::Orphaned => warn!("Dropping {:?} reply with no pending request", kind),
        }
    }

    /// Send `request` to the extension and wait for its correlated reply.
    pub async fn request(&self, request: RelayRequest) -> Result<Value, RelayError> {
        let (connection_id, sender) = self
            .registry
            .active_sender()
            .ok_or(RelayError::ConnectionUnavailable)?;

        let kind = request.reply_kind();
        let operation = request.operation();
        let timeout = match kind {
            ReplyKind::Screenshot => self.config.screenshot_timeout(),
            ReplyKind::AuthToken => self.config.auth_token_timeout(),
        };

        let request_id = self.correlator.next_request_id();
        let pending = self.correlator.register(request_id.clone(), kind)?;
        let message = request.into_message(request_id.clone());

        // Never block on a stalled writer.
        let sent = sender.try_send(Outbound::Message(message));
        // Only the registry may keep the writer alive while we wait.
        drop(sender);
        match sent {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.correlator.cancel(&request_id);
                warn!("Outbound queue full on {}, dropping {}", connection_id, request_id);
                return Err(RelayError::Transport(format!(
                    "outbound queue for connection {} is full",
                    connection_id
                )));
            }
            Err(TrySendError::Closed(_)) => {
                self.correlator.cancel(&request_id);
                self.detach(&connection_id);
                return Err(RelayError::Transport(format!(
                    "connection {} closed before the request could be sent",
                    connection_id
                )));
            }
        }
        info!(
            "{} requested ({}) on {}",
            operation, request_id, connection_id
        );

        self.correlator
            .wait(pending, timeout, || RelayError::RequestTimeout {
                operation: operation.to_string(),
                connection_id: connection_id.clone(),
                secs: timeout.as_secs(),
            })
            .await
    }

    pub fn page(&self) -> PageInfo {
        self.page.read().clone()
    }

    /// Record the page the extension is on; returns the previous one.
    pub fn set_page(&self, url: String, tab_id: Option<Value>) -> PageInfo {
        let mut page = self.page.write();
        let previous = page.clone();
        page.url = Some(url);
        if tab_id.is_some() {
            page.tab_id = tab_id;
        }
        previous
    }

    /// Tell the extension the relay is going away and close the channel.
    pub fn shutdown(&self) {
        let Some(connection_id) = self.registry.active_id() else {
            return;
        };
        info!("Closing extension connection {} for shutdown", connection_id);
        self.registry
            .try_send_to(&connection_id, ServerMessage::ServerShutdown);
        self.correlator.reject_all(RelayError::ConnectionLost {
            connection_id: connection_id.clone(),
            reason: "Server shutting down".to_string(),
        });
        self.registry
            .close(&connection_id, CLOSE_NORMAL, "Server shutting down");
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
