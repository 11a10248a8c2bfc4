//! Relay application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use relay_config::RelayConfig;
use reqwest::Client;

use crate::api_call::ApiCaller;
use crate::channel::ExtensionBridge;
use crate::logs::LogStore;
use crate::screenshot::{FileScreenshotStore, ScreenshotStore};

/// Timeout for the outbound leg of `/authenticated-api-call`.
const API_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared by every HTTP and WebSocket handler.
pub struct RelayState {
    pub bridge: Arc<ExtensionBridge>,
    pub logs: LogStore,
    pub screenshots: Arc<dyn ScreenshotStore>,
    pub api: ApiCaller,
    port: AtomicU16,
    start_time: Instant,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_store(
            config,
            Arc::new(FileScreenshotStore::new(&config.screenshots)),
        )
    }

    /// Build state around a custom screenshot store.
    pub fn with_store(config: &RelayConfig, screenshots: Arc<dyn ScreenshotStore>) -> Self {
        let client = Client::builder()
            .timeout(API_CALL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            bridge: Arc::new(ExtensionBridge::new(config.relay.clone())),
            logs: LogStore::new(&config.logs),
            screenshots,
            api: ApiCaller::new(client),
            port: AtomicU16::new(config.server.port),
            start_time: Instant::now(),
        }
    }

    /// Port the server actually bound.
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::Relaxed)
    }

    pub fn set_port(&self, port: u16) {
        self.port.store(port, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
