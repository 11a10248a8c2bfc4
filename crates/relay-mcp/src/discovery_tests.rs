use super::*;
use parking_lot::Mutex;
use relay_protocols::SERVER_SIGNATURE;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers as a relay on exactly one candidate and records every probe.
pub(crate) struct ScriptedProbe {
    relay_at: Option<(String, u16)>,
    foreign_at: Option<(String, u16)>,
    pub(crate) calls: Mutex<Vec<(String, u16)>>,
}

impl ScriptedProbe {
    pub(crate) fn relay_at(host: &str, port: u16) -> Self {
        Self {
            relay_at: Some((host.to_string(), port)),
            foreign_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn nothing() -> Self {
        Self {
            relay_at: None,
            foreign_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_foreign(mut self, host: &str, port: u16) -> Self {
        self.foreign_at = Some((host.to_string(), port));
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl IdentityProbe for ScriptedProbe {
    async fn probe(&self, host: &str, port: u16) -> Option<ServerIdentity> {
        let candidate = (host.to_string(), port);
        self.calls.lock().push(candidate.clone());
        if self.relay_at.as_ref() == Some(&candidate) {
            return Some(ServerIdentity::new(port));
        }
        if self.foreign_at.as_ref() == Some(&candidate) {
            return Some(ServerIdentity {
                port,
                name: "some-dev-server".to_string(),
                version: "0.1".to_string(),
                signature: "something-else".to_string(),
            });
        }
        None
    }
}

#[tokio::test]
async fn test_finds_relay_on_third_host_second_port() {
    let plan = DiscoveryPlan::new(["h", "127.0.0.1", "localhost"], [3025, 3026]);
    let probe = ScriptedProbe::relay_at("localhost", 3026);

    let endpoint = discover(&plan, &probe).await.unwrap();

    assert_eq!(endpoint, DiscoveredEndpoint::found("localhost", 3026));
    // Scanning stops at the match: six candidates, the last one hit.
    assert_eq!(probe.call_count(), 6);
    assert_eq!(
        probe.calls.lock().last().cloned(),
        Some(("localhost".to_string(), 3026))
    );
}

#[tokio::test]
async fn test_first_match_stops_the_scan() {
    let plan = DiscoveryPlan::new(["127.0.0.1", "localhost"], [3025, 3026, 3027]);
    let probe = ScriptedProbe::relay_at("127.0.0.1", 3025);

    let endpoint = discover(&plan, &probe).await.unwrap();
    assert_eq!(endpoint.port, 3025);
    assert_eq!(probe.call_count(), 1);
}

#[tokio::test]
async fn test_foreign_signature_is_skipped() {
    let plan = DiscoveryPlan::new(["127.0.0.1"], [3025, 3026]);
    let probe = ScriptedProbe::relay_at("127.0.0.1", 3026).with_foreign("127.0.0.1", 3025);

    let endpoint = discover(&plan, &probe).await.unwrap();
    assert_eq!(endpoint.port, 3026);
    assert_eq!(probe.call_count(), 2);
}

#[tokio::test]
async fn test_exhaustion_probes_each_candidate_once() {
    let config = DiscoveryConfig::default();
    // Preferred host equals one of the fixed hosts, preferred port is in the range.
    let plan = DiscoveryPlan::from_config(&config, 3030);
    let probe = ScriptedProbe::nothing();

    let err = discover(&plan, &probe).await.unwrap_err();

    assert_eq!(err, RelayError::DiscoveryFailed { probes: 22 });
    let calls = probe.calls.lock().clone();
    assert_eq!(calls.len(), 22);
    let mut unique = calls.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), calls.len());
}

#[test]
fn test_plan_puts_preferred_port_first() {
    let config = DiscoveryConfig {
        host: "192.168.1.20".to_string(),
        ..Default::default()
    };
    let plan = DiscoveryPlan::from_config(&config, 3030);

    assert_eq!(plan.hosts(), ["192.168.1.20", "127.0.0.1", "localhost"]);
    assert_eq!(plan.ports()[0], 3030);
    assert_eq!(plan.ports().len(), 11);
    assert_eq!(plan.ports()[1..], [3025, 3026, 3027, 3028, 3029, 3031, 3032, 3033, 3034, 3035]);
    assert_eq!(plan.len(), 33);
}

#[test]
fn test_plan_with_port_outside_range() {
    let plan = DiscoveryPlan::from_config(&DiscoveryConfig::default(), 4000);
    assert_eq!(plan.ports().len(), 12);
    assert_eq!(plan.ports()[0], 4000);
    assert_eq!(plan.ports()[11], 3035);
}

#[tokio::test]
async fn test_http_probe_reads_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.identity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "port": 3025,
            "name": "browser-tools-server",
            "version": "1.2.0",
            "signature": SERVER_SIGNATURE,
        })))
        .mount(&server)
        .await;

    let address = server.address();
    let probe = HttpIdentityProbe::new(Duration::from_secs(1));
    let identity = probe
        .probe(&address.ip().to_string(), address.port())
        .await
        .unwrap();
    assert!(identity.is_relay());
}

#[tokio::test]
async fn test_http_probe_rejects_error_status_and_non_json() {
    let server = MockServer::start().await;
    Mock::given(path("/.identity"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
        .mount(&server)
        .await;
    let address = server.address();
    let probe = HttpIdentityProbe::new(Duration::from_secs(1));
    assert!(probe.probe(&address.ip().to_string(), address.port()).await.is_none());

    let missing = MockServer::start().await;
    let address = missing.address();
    assert!(probe.probe(&address.ip().to_string(), address.port()).await.is_none());
}
