//! Relay server identity.
//!
//! Every relay answers `GET /.identity` with the same signature regardless of
//! the port it ended up on, so clients can tell it apart from unrelated local
//! services during a port scan.

use serde::{Deserialize, Serialize};

/// Fixed signature that marks a relay server.
pub const SERVER_SIGNATURE: &str = "mcp-browser-connector-24x7";

/// Name reported in the identity response.
pub const SERVER_NAME: &str = "browser-tools-server";

/// Protocol version reported in the identity response.
pub const SERVER_VERSION: &str = "1.2.0";

/// Port the relay prefers and discovery scans first.
pub const DEFAULT_PORT: u16 = 3025;

/// Body of `GET /.identity`.
///
/// Fields default when absent so that probing a foreign service that happens
/// to return JSON never fails to parse; such a body simply does not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub signature: String,
}

impl ServerIdentity {
    /// Identity of a relay bound to `port`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
            signature: SERVER_SIGNATURE.to_string(),
        }
    }

    /// Whether this identity was produced by a relay server.
    pub fn is_relay(&self) -> bool {
        self.signature == SERVER_SIGNATURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_new_is_relay() {
        let identity = ServerIdentity::new(3027);
        assert_eq!(identity.port, 3027);
        assert_eq!(identity.name, "browser-tools-server");
        assert!(identity.is_relay());
    }

    #[test]
    fn test_identity_wire_shape() {
        let json = serde_json::to_value(ServerIdentity::new(3025)).unwrap();
        assert_eq!(json["signature"], "mcp-browser-connector-24x7");
        assert_eq!(json["port"], 3025);
        assert_eq!(json["version"], "1.2.0");
    }

    #[test]
    fn test_foreign_body_does_not_match() {
        let identity: ServerIdentity =
            serde_json::from_str(r#"{"status":"ok","version":"9.9"}"#).unwrap();
        assert!(!identity.is_relay());
        assert_eq!(identity.port, 0);
    }

    #[test]
    fn test_signature_only_body_matches() {
        // Older relays answered with signature and version only.
        let identity: ServerIdentity =
            serde_json::from_str(r#"{"signature":"mcp-browser-connector-24x7","version":"1.2.0"}"#)
                .unwrap();
        assert!(identity.is_relay());
    }
}
