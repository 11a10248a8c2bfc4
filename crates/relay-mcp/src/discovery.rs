//! Locating a running relay by its identity signature.
//!
//! Candidates are scanned host-major: every port on the first host, then
//! every port on the next. The first candidate whose `/.identity` carries the
//! relay signature wins; probe failures just move the scan along.

use std::time::Duration;

use async_trait::async_trait;
use relay_config::DiscoveryConfig;
use relay_protocols::{RelayError, ServerIdentity};
use reqwest::Client;
use tracing::{debug, info, warn};


/// Where the relay was last found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEndpoint {
    pub host: String,
    pub port: u16,
    pub discovered: bool,
}

impl DiscoveredEndpoint {
    pub fn found(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            discovered: true,
        }
    }

    /// Placeholder before the first scan.
    pub fn undiscovered(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            discovered: false,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Fetches `/.identity` from one candidate.
#[async_trait]
pub trait IdentityProbe: Send + Sync {
    /// `None` when the candidate is unreachable, times out or is not JSON.
    async fn probe(&self, host: &str, port: u16) -> Option<ServerIdentity>;
}

/// Probe over plain HTTP with a short per-request timeout.
pub struct HttpIdentityProbe {
    client: Client,
}

impl HttpIdentityProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl IdentityProbe for HttpIdentityProbe {
    async fn probe(&self, host: &str, port: u16) -> Option<ServerIdentity> {
        let url = format!("http://{}:{}/.identity", host, port);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Error checking {}:{}: {}", host, port, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("{}:{} answered {}", host, port, response.status());
            return None;
        }
        response.json::<ServerIdentity>().await.ok()
    }
}

/// Ordered candidate hosts and ports, without repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPlan {
    hosts: Vec<String>,
    ports: Vec<u16>,
}

impl DiscoveryPlan {
    pub fn new<H, S>(hosts: H, ports: impl IntoIterator<Item = u16>) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut plan = Self {
            hosts: Vec::new(),
            ports: Vec::new(),
        };
        for host in hosts {
            let host = host.into();
            if !plan.hosts.contains(&host) {
                plan.hosts.push(host);
            }
        }
        for port in ports {
            if !plan.ports.contains(&port) {
                plan.ports.push(port);
            }
        }
        plan
    }

    /// `[preferred, 127.0.0.1, localhost]` x `[preferred port, fallback range]`.
    pub fn from_config(config: &DiscoveryConfig, preferred_port: u16) -> Self {
        let fallback_end = config
            .fallback_start
            .saturating_add(config.fallback_count.saturating_sub(1));
        let fallback = (config.fallback_start..=fallback_end).take(config.fallback_count as usize);
        Self::new(
            [config.host.as_str(), "127.0.0.1", "localhost"],
            std::iter::once(preferred_port).chain(fallback),
        )
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.hosts.len() * self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn candidates(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.hosts
            .iter()
            .flat_map(|host| self.ports.iter().map(move |port| (host.as_str(), *port)))
    }
}

/// Scan `plan` in order and return the first relay found.
pub async fn discover(
    plan: &DiscoveryPlan,
    probe: &dyn IdentityProbe,
) -> Result<DiscoveredEndpoint, RelayError> {
    debug!(
        "Starting discovery over hosts {:?} and ports {:?}",
        plan.hosts(),
        plan.ports()
    );
    for (host, port) in plan.candidates() {
        match probe.probe(host, port).await {
            Some(identity) if identity.is_relay() => {
                info!("Found browser relay at {}:{}", host, port);
                return Ok(DiscoveredEndpoint::found(host, port));
            }
            Some(identity) => {
                debug!(
                    "{}:{} is not a relay (signature {:?})",
                    host, port, identity.signature
                );
            }
            None => {}
        }
    }
    warn!("No browser relay found after {} probes", plan.len());
    Err(RelayError::DiscoveryFailed { probes: plan.len() })
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
