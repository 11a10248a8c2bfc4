//! Relay access for tools: cached discovery plus retry-once.
//!
//! State machine: `UNDISCOVERED -> DISCOVERED -> (call fails) -> UNDISCOVERED`.
//! A failed call forces one rediscovery and at most one retry.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relay_config::{ConfigLoader, DiscoveryConfig, RelayConfig};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::discovery::{
    DiscoveredEndpoint, DiscoveryPlan, HttpIdentityProbe, IdentityProbe, discover,
};
use crate::error::AdapterError;
use crate::protocol::ToolResult;

/// Upper bound for one relay HTTP call; screenshot capture alone may take 15s.
const RELAY_CALL_TIMEOUT: Duration = Duration::from_secs(60);

const DISCOVERY_FAILED: &str =
    "Failed to discover browser connector server. Please ensure it's running.";

/// Handle to the discovered relay, passed into each call attempt.
#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    base_url: String,
}

/// Status plus raw body of a relay response.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RelayResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json(&self) -> Result<Value, AdapterError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Error body text, or the reason phrase when the body is empty.
    pub fn error_text(&self) -> String {
        if self.body.trim().is_empty() {
            self.status
                .canonical_reason()
                .unwrap_or_default()
                .to_string()
        } else {
            self.body.clone()
        }
    }
}

impl RelayClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<RelayResponse, AdapterError> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::read(response).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RelayResponse, AdapterError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::read(response).await
    }

    /// GET that must succeed and return JSON.
    pub async fn get_json(&self, path: &str) -> Result<Value, AdapterError> {
        let response = self.get(path).await?;
        if !response.is_success() {
            return Err(AdapterError::Status {
                status: response.status.as_u16(),
                body: response.error_text(),
            });
        }
        response.json()
    }

    async fn read(response: reqwest::Response) -> Result<RelayResponse, AdapterError> {
        let status = response.status();
        let body = response.text().await?;
        Ok(RelayResponse { status, body })
    }
}

pub struct RelayAdapter {
    discovery: DiscoveryConfig,
    port_file: PathBuf,
    probe: Arc<dyn IdentityProbe>,
    http: Client,
    endpoint: Mutex<DiscoveredEndpoint>,
}

impl RelayAdapter {
    pub fn new(config: &RelayConfig) -> Self {
        let probe = Arc::new(HttpIdentityProbe::new(config.discovery.probe_timeout()));
        Self::with_probe(config, probe)
    }

    pub fn with_probe(config: &RelayConfig, probe: Arc<dyn IdentityProbe>) -> Self {
        let port_file = ConfigLoader::expand_path(&config.server.port_file);
        let http = Client::builder()
            .timeout(RELAY_CALL_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        let initial = DiscoveredEndpoint::undiscovered(
            config.discovery.host.clone(),
            config.discovery.preferred_port(&port_file),
        );
        Self {
            discovery: config.discovery.clone(),
            port_file,
            probe,
            http,
            endpoint: Mutex::new(initial),
        }
    }

    /// Last known relay location.
    pub fn endpoint(&self) -> DiscoveredEndpoint {
        self.endpoint.lock().clone()
    }

    pub fn is_discovered(&self) -> bool {
        self.endpoint.lock().discovered
    }

    /// Run one discovery scan, updating the cached endpoint on success.
    ///
    /// The plan is rebuilt every time so a relay restarted on another port is
    /// picked up from the port file.
    pub async fn discover(&self) -> bool {
        let preferred = self.discovery.preferred_port(&self.port_file);
        let plan = DiscoveryPlan::from_config(&self.discovery, preferred);
        match discover(&plan, self.probe.as_ref()).await {
            Ok(found) => {
                *self.endpoint.lock() = found;
                true
            }
            Err(_) => {
                self.endpoint.lock().discovered = false;
                false
            }
        }
    }

    fn client(&self) -> RelayClient {
        RelayClient::new(self.http.clone(), self.endpoint.lock().base_url())
    }

    /// Run `call` against the relay, discovering it first when needed.
    ///
    /// Failures never escape: they become error results the assistant can read.
    pub async fn with_connection<F, Fut>(&self, call: F) -> ToolResult
    where
        F: Fn(RelayClient) -> Fut,
        Fut: Future<Output = Result<ToolResult, AdapterError>>,
    {
        if !self.is_discovered() && !self.discover().await {
            return ToolResult::error(DISCOVERY_FAILED);
        }

        let err = match call(self.client()).await {
            Ok(result) => return result,
            Err(err) => err,
        };

        warn!("API call failed: {}. Attempting rediscovery...", err);
        self.endpoint.lock().discovered = false;

        if !self.discover().await {
            warn!("Rediscovery failed. Could not reconnect to server.");
            return ToolResult::error(format!("Failed to reconnect to server: {}", err));
        }

        info!("Rediscovery successful. Retrying API call...");
        match call(self.client()).await {
            Ok(result) => result,
            Err(retry_err) => {
                warn!("Retry failed: {}", retry_err);
                self.endpoint.lock().discovered = false;
                ToolResult::error(format!("Error after reconnection attempt: {}", retry_err))
            }
        }
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
