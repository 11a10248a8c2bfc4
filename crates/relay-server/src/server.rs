//! Relay server implementation.
//!
//! Binds the first free port at or above the configured one, publishes it
//! to the port file and serves until Ctrl-C.

use std::future::Future;
use std::io::ErrorKind;
use std::sync::Arc;

use relay_config::{ConfigLoader, RelayConfig, write_port_file};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::http::routes::create_router;
use crate::state::RelayState;

/// The relay server.
pub struct RelayServer {
    config: RelayConfig,
    state: Arc<RelayState>,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        let state = Arc::new(RelayState::new(&config));
        Self { config, state }
    }

    /// Create a server around pre-built state.
    pub fn with_state(config: RelayConfig, state: Arc<RelayState>) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> Arc<RelayState> {
        self.state.clone()
    }

    /// Bind `server.port`, moving up past ports that are in use.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let host = self.config.server.host.as_str();
        let start = self.config.server.port;
        if start == 0 {
            return bind_addr(host, 0).await;
        }

        let attempts = self.config.server.port_attempts.max(1);
        let end = start.saturating_add(attempts - 1);
        for port in start..=end {
            match TcpListener::bind((host, port)).await {
                Ok(listener) => {
                    if port != start {
                        info!("Port {} was busy, using {}", start, port);
                    }
                    return Ok(listener);
                }
                Err(e) if e.kind() == ErrorKind::AddrInUse => {
                    warn!("Port {} is in use, trying the next one", port);
                }
                Err(source) => {
                    return Err(ServerError::Bind {
                        addr: format!("{}:{}", host, port),
                        source,
                    });
                }
            }
        }
        Err(ServerError::NoAvailablePort { start, end })
    }

    /// Bind and serve until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` completes.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.state.set_port(addr.port());
        self.publish_port(addr.port());

        let app = create_router(self.state.clone());
        let bridge = self.state.bridge.clone();

        info!("Browser relay listening on {}", addr);
        info!("Extension WebSocket at ws://{}/extension-ws", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutting down browser relay");
                bridge.shutdown();
            })
            .await?;

        info!("Browser relay stopped");
        Ok(())
    }

    fn publish_port(&self, port: u16) {
        let port_file = self.config.server.port_file.trim();
        if port_file.is_empty() {
            return;
        }
        let path = ConfigLoader::expand_path(port_file);
        match write_port_file(&path, port) {
            Ok(()) => info!("Port {} written to {:?}", port, path),
            Err(e) => warn!("Failed to write port file {:?}: {}", path, e),
        }
    }
}

async fn bind_addr(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: format!("{}:{}", host, port),
            source,
        })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_on(port: u16, attempts: u16) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.server.port_attempts = attempts;
        config.server.port_file = String::new();
        config
    }

    #[tokio::test]
    async fn test_bind_skips_busy_port() {
        let busy = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let busy_port = busy.local_addr().unwrap().port();

        let server = RelayServer::new(config_on(busy_port, 5));
        let listener = server.bind().await.unwrap();
        let bound = listener.local_addr().unwrap().port();
        assert_ne!(bound, busy_port);
        assert!(bound > busy_port && bound <= busy_port + 4);
    }

    #[tokio::test]
    async fn test_bind_reports_exhaustion() {
        let busy = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let busy_port = busy.local_addr().unwrap().port();

        let server = RelayServer::new(config_on(busy_port, 1));
        let err = server.bind().await.unwrap_err();
        assert!(matches!(
            err,
            ServerError::NoAvailablePort { start, end } if start == busy_port && end == busy_port
        ));
    }

    #[tokio::test]
    async fn test_serve_publishes_port_and_stops() {
        let dir = tempfile::TempDir::new().unwrap();
        let port_file = dir.path().join(".port");
        let mut config = config_on(0, 1);
        config.server.port_file = port_file.display().to_string();

        let server = RelayServer::new(config);
        let state = server.state();
        let listener = server.bind().await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = stop_rx.await;
        }));

        let identity: relay_protocols::ServerIdentity =
            reqwest::get(format!("http://127.0.0.1:{}/.identity", port))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(identity.port, port);
        assert_eq!(state.port(), port);
        assert_eq!(relay_config::read_port_file(&port_file), Some(port));

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
