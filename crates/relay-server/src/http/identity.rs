//! Identity, port and health handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use relay_protocols::{ConnectionHealth, ServerIdentity};

use crate::state::RelayState;

/// `GET /.identity`
pub async fn identity(State(state): State<Arc<RelayState>>) -> Json<ServerIdentity> {
    Json(ServerIdentity::new(state.port()))
}

/// `GET /.port`
pub async fn port(State(state): State<Arc<RelayState>>) -> String {
    state.port().to_string()
}

/// `GET /connection-health`
pub async fn connection_health(State(state): State<Arc<RelayState>>) -> Json<ConnectionHealth> {
    let snapshot = state.bridge.connection_snapshot();
    let timeout = state.bridge.config().heartbeat_timeout();
    Json(ConnectionHealth {
        connected: snapshot.is_some(),
        healthy: snapshot
            .as_ref()
            .is_some_and(|s| s.since_heartbeat <= timeout),
        connection_id: snapshot.as_ref().map(|s| s.connection_id.clone()),
        last_heartbeat_ms_ago: snapshot
            .as_ref()
            .map(|s| s.since_heartbeat.as_millis() as u64),
        pending_requests: state.bridge.pending_requests(),
        uptime_secs: state.uptime().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
