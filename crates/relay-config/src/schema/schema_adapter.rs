//! Tool adapter configuration: relay discovery and the authenticated API surface.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the tool adapter locates a running relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_host")]
    pub host: String,

    /// Explicit preferred port. When unset the published port file is used.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_fallback_start")]
    pub fallback_start: u16,

    #[serde(default = "default_fallback_count")]
    pub fallback_count: u16,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Explicit port, else the port published by a running relay, else the default.
    pub fn preferred_port(&self, port_file: &Path) -> u16 {
        self.port
            .or_else(|| crate::read_port_file(port_file))
            .unwrap_or(relay_protocols::DEFAULT_PORT)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            host: default_discovery_host(),
            port: None,
            fallback_start: default_fallback_start(),
            fallback_count: default_fallback_count(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_discovery_host() -> String {
    "127.0.0.1".to_string()
}

fn default_fallback_start() -> u16 {
    relay_protocols::DEFAULT_PORT
}

fn default_fallback_count() -> u16 {
    11
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

/// Settings consumed by the API-oriented tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub auth_origin: Option<String>,

    #[serde(default)]
    pub auth_storage_type: Option<String>,

    #[serde(default)]
    pub auth_token_key: Option<String>,

    #[serde(default)]
    pub api_base_url: Option<String>,

    /// OpenAPI/Swagger document, as an http(s) URL or a file path.
    #[serde(default)]
    pub swagger_url: Option<String>,

    /// Root used to resolve relative image paths.
    #[serde(default)]
    pub project_root: Option<String>,
}
