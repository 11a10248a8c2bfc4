//! Single-slot registry for the extension connection.
//!
//! At most one extension channel is active. Replies carry no channel address,
//! so a second live channel would make correlation ambiguous; a new attach
//! therefore closes and replaces the previous one.

use std::time::Duration;

use parking_lot::Mutex;
use relay_protocols::ServerMessage;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Close code for a normal, intentional closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code used when the relay gives up on an unresponsive peer.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Frame queued for a connection's socket writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMessage),
    Close { code: u16, reason: String },
}

struct ActiveConnection {
    connection_id: String,
    sender: mpsc::Sender<Outbound>,
    connected_at: Instant,
    last_heartbeat: Instant,
    monitor: CancellationToken,
}

/// Result of [`ConnectionRegistry::attach`].
#[derive(Debug)]
pub struct Attached {
    pub connection_id: String,
    /// Cancelled when this connection leaves the slot.
    pub monitor: CancellationToken,
    /// Id of the connection that was closed to make room, if any.
    pub replaced: Option<String>,
}

/// Point-in-time view of the active connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub connection_id: String,
    pub connected_for: Duration,
    pub since_heartbeat: Duration,
}

/// Holds the one live extension channel.
#[derive(Default)]
pub struct ConnectionRegistry {
    slot: Mutex<Option<ActiveConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new connection, gracefully closing any existing one.
    pub fn attach(&self, sender: mpsc::Sender<Outbound>) -> Attached {
        let connection_id = new_connection_id();
        let monitor = CancellationToken::new();
        let now = Instant::now();

        let previous = self.slot.lock().replace(ActiveConnection {
            connection_id: connection_id.clone(),
            sender,
            connected_at: now,
            last_heartbeat: now,
            monitor: monitor.clone(),
        });

        let replaced = previous.map(|old| {
            info!(
                "Replacing connection {} with {}",
                old.connection_id, connection_id
            );
            old.monitor.cancel();
            let close = Outbound::Close {
                code: CLOSE_NORMAL,
                reason: "New connection established".to_string(),
            };
            if old.sender.try_send(close).is_err() {
                debug!("Previous connection {} already gone", old.connection_id);
            }
            old.connection_id
        });

        info!("Extension connected: {}", connection_id);
        Attached {
            connection_id,
            monitor,
            replaced,
        }
    }

    /// Remove `connection_id` if it still owns the slot.
    ///
    /// Returns false when the slot is empty or belongs to a newer connection.
    pub fn detach(&self, connection_id: &str) -> bool {
        let removed = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(active) if active.connection_id == connection_id => slot.take(),
                _ => None,
            }
        };
        match removed {
            Some(active) => {
                active.monitor.cancel();
                info!("Extension disconnected: {}", connection_id);
                true
            }
            None => false,
        }
    }

    /// Queue a close frame for `connection_id` and remove it from the slot.
    pub fn close(&self, connection_id: &str, code: u16, reason: &str) -> bool {
        let sender = self.sender_for(connection_id);
        if let Some(sender) = sender {
            let close = Outbound::Close {
                code,
                reason: reason.to_string(),
            };
            if sender.try_send(close).is_err() {
                warn!("Could not queue close frame for {}", connection_id);
            }
        }
        self.detach(connection_id)
    }

    /// True when a connection holds the slot and its writer is still running.
    pub fn has_active_connection(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|active| !active.sender.is_closed())
    }

    pub fn active_id(&self) -> Option<String> {
        self.slot
            .lock()
            .as_ref()
            .map(|active| active.connection_id.clone())
    }

    /// Sender of the active connection together with its id.
    pub fn active_sender(&self) -> Option<(String, mpsc::Sender<Outbound>)> {
        self.slot
            .lock()
            .as_ref()
            .map(|active| (active.connection_id.clone(), active.sender.clone()))
    }

    fn sender_for(&self, connection_id: &str) -> Option<mpsc::Sender<Outbound>> {
        self.slot
            .lock()
            .as_ref()
            .filter(|active| active.connection_id == connection_id)
            .map(|active| active.sender.clone())
    }

    /// Record a heartbeat response. Ignored unless `connection_id` is active.
    pub fn touch(&self, connection_id: &str) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_mut() {
            Some(active) if active.connection_id == connection_id => {
                active.last_heartbeat = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Time since the last heartbeat response of `connection_id`, if it is active.
    pub fn since_heartbeat(&self, connection_id: &str) -> Option<Duration> {
        self.slot
            .lock()
            .as_ref()
            .filter(|active| active.connection_id == connection_id)
            .map(|active| active.last_heartbeat.elapsed())
    }

    /// Non-blocking send to `connection_id`; fails if it is no longer active.
    pub fn try_send_to(&self, connection_id: &str, message: ServerMessage) -> bool {
        match self.sender_for(connection_id) {
            Some(sender) => sender.try_send(Outbound::Message(message)).is_ok(),
            None => false,
        }
    }

    pub fn snapshot(&self) -> Option<ConnectionSnapshot> {
        self.slot.lock().as_ref().map(|active| ConnectionSnapshot {
            connection_id: active.connection_id.clone(),
            connected_for: active.connected_at.elapsed(),
            since_heartbeat: active.last_heartbeat.elapsed(),
        })
    }
}

/// `conn_<unix-ms>_<random>`; used in logs and error messages only.
fn new_connection_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "conn_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..9]
    )
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
