//! Heartbeat monitor for the extension channel.
//!
//! A network partition does not produce a close frame, so liveness is
//! tracked by periodic probes. Each connection gets its own monitor task,
//! cancelled through the registry when the connection leaves the slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::bridge::ExtensionBridge;

/// Outcome of one monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTick {
    /// Probe sent; keep monitoring.
    Sent,
    /// The connection is gone or was torn down; stop monitoring.
    Stop,
}

/// Spawn the monitor loop for `connection_id`.
///
/// The first probe goes out one `interval` after attach.
pub fn spawn_monitor(
    bridge: Arc<ExtensionBridge>,
    connection_id: String,
    token: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if bridge.heartbeat_tick(&connection_id) == HeartbeatTick::Stop {
                        break;
                    }
                }
            }
        }
        debug!("Heartbeat monitor stopped for {}", connection_id);
    })
}
