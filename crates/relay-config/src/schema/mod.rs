//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod schema_adapter;

pub use schema_adapter::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub relay: ChannelConfig,

    #[serde(default)]
    pub logs: LogConfig,

    #[serde(default)]
    pub screenshots: ScreenshotConfig,

    // Tool adapter side
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

/// Listener configuration for the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// First port tried; later ports are tried when it is taken.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_port_attempts")]
    pub port_attempts: u16,

    /// Where the bound port is published for the tool adapter.
    #[serde(default = "default_port_file")]
    pub port_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_attempts: default_port_attempts(),
            port_file: default_port_file(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    relay_protocols::DEFAULT_PORT
}

fn default_port_attempts() -> u16 {
    10
}

fn default_port_file() -> String {
    "~/.browser-relay/.port".to_string()
}

/// Extension channel tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,

    #[serde(default = "default_screenshot_timeout")]
    pub screenshot_timeout_secs: u64,

    #[serde(default = "default_auth_token_timeout")]
    pub auth_token_timeout_secs: u64,

    /// Upper bound on correlated requests awaiting a reply.
    #[serde(default = "default_max_pending")]
    pub max_pending_requests: usize,

    /// Frames buffered per connection before sends start failing.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl ChannelConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn screenshot_timeout(&self) -> Duration {
        Duration::from_secs(self.screenshot_timeout_secs)
    }

    pub fn auth_token_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_token_timeout_secs)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            screenshot_timeout_secs: default_screenshot_timeout(),
            auth_token_timeout_secs: default_auth_token_timeout(),
            max_pending_requests: default_max_pending(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    25
}

fn default_heartbeat_timeout() -> u64 {
    60
}

fn default_screenshot_timeout() -> u64 {
    15
}

fn default_auth_token_timeout() -> u64 {
    10
}

fn default_max_pending() -> usize {
    64
}

fn default_outbound_buffer() -> usize {
    64
}

/// In-memory log buffers fed by the extension.
///
/// The extension may override the limits at runtime through `/extension-log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_limit")]
    pub log_limit: usize,

    /// Cumulative serialized size returned by a single query.
    #[serde(default = "default_query_limit")]
    pub query_limit: usize,

    #[serde(default = "default_network_cache_size")]
    pub network_cache_size: usize,

    #[serde(default)]
    pub show_request_headers: bool,

    #[serde(default)]
    pub show_response_headers: bool,

    #[serde(default = "default_string_size_limit")]
    pub string_size_limit: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_limit: default_log_limit(),
            query_limit: default_query_limit(),
            network_cache_size: default_network_cache_size(),
            show_request_headers: false,
            show_response_headers: false,
            string_size_limit: default_string_size_limit(),
        }
    }
}

fn default_log_limit() -> usize {
    50
}

fn default_query_limit() -> usize {
    30_000
}

fn default_network_cache_size() -> usize {
    50
}

fn default_string_size_limit() -> usize {
    500
}

/// Screenshot filing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Fixed project folder; detected from git or the working directory when unset.
    #[serde(default)]
    pub project_name: Option<String>,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            project_name: None,
        }
    }
}

fn default_storage_path() -> String {
    "~/Downloads/Windsurf_Screenshots".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
