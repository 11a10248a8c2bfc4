//! HTTP bodies for the relay endpoints.
//!
//! Request bodies keep required fields optional so a handler can report every
//! missing field at once instead of failing on the first.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the extension should look for an auth token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageType {
    Cookie,
    LocalStorage,
    SessionStorage,
}

impl StorageType {
    pub const ALL: [StorageType; 3] = [Self::Cookie, Self::LocalStorage, Self::SessionStorage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::LocalStorage => "localStorage",
            Self::SessionStorage => "sessionStorage",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid storageType: {}. Must be one of: cookie, localStorage, sessionStorage",
                    s
                )
            })
    }
}

/// `POST /capture-screenshot` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshotRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default = "default_true")]
    pub return_image_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl Default for CaptureScreenshotRequest {
    fn default() -> Self {
        Self {
            filename: None,
            return_image_data: true,
            project_name: None,
        }
    }
}

/// `POST /capture-screenshot` success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureScreenshotResponse {
    pub file_path: String,
    pub filename: String,
    pub project_directory: String,
    pub url_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

/// Token location, as posted to `/auth-token-proxy` and nested in
/// `/authenticated-api-call`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_key: Option<String>,
}

/// A validated [`AuthConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub origin: String,
    pub storage_type: StorageType,
    pub token_key: String,
}

impl AuthConfig {
    pub fn new(
        origin: impl Into<String>,
        storage_type: StorageType,
        token_key: impl Into<String>,
    ) -> Self {
        Self {
            origin: Some(origin.into()),
            storage_type: Some(storage_type.as_str().to_string()),
            token_key: Some(token_key.into()),
        }
    }

    /// Names of required fields that are absent or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.origin) {
            missing.push("origin");
        }
        if is_blank(&self.storage_type) {
            missing.push("storageType");
        }
        if is_blank(&self.token_key) {
            missing.push("tokenKey");
        }
        missing
    }

    /// Validate into a [`TokenRequest`], describing every problem on failure.
    pub fn validate(&self) -> Result<TokenRequest, String> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        }
        let storage_type = self.storage_type.as_deref().unwrap_or_default().parse()?;
        Ok(TokenRequest {
            origin: self.origin.clone().unwrap_or_default(),
            storage_type,
            token_key: self.token_key.clone().unwrap_or_default(),
        })
    }
}

/// `POST /auth-token-proxy` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub token: String,
}

/// Methods accepted for `/authenticated-api-call`.
pub const API_CALL_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Outbound call description inside `/authenticated-api-call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_headers: Option<BTreeMap<String, String>>,
}

impl Default for ApiCallSpec {
    fn default() -> Self {
        Self {
            base_url: None,
            endpoint: None,
            method: default_method(),
            request_body: None,
            query_params: None,
            additional_headers: None,
        }
    }
}

impl ApiCallSpec {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.base_url) {
            missing.push("baseUrl");
        }
        if is_blank(&self.endpoint) {
            missing.push("endpoint");
        }
        missing
    }

    /// Check `method` against the methods the relay forwards.
    pub fn validate_method(&self) -> Result<(), String> {
        let method = self.method.trim().to_ascii_uppercase();
        if API_CALL_METHODS.contains(&method.as_str()) {
            Ok(())
        } else {
            Err(format!(
                "Invalid HTTP method: {} (expected one of {})",
                self.method,
                API_CALL_METHODS.join(", ")
            ))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallOptions {
    #[serde(default = "default_true")]
    pub include_response_details: bool,
}

impl Default for ApiCallOptions {
    fn default() -> Self {
        Self {
            include_response_details: true,
        }
    }
}

/// `POST /authenticated-api-call` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedApiCallRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<AuthConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_call: Option<ApiCallSpec>,
    #[serde(default)]
    pub options: ApiCallOptions,
}

impl AuthenticatedApiCallRequest {
    /// Missing fields, qualified by their section (`authConfig.origin`).
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        match &self.auth_config {
            Some(auth) => missing.extend(
                auth.missing_fields()
                    .into_iter()
                    .map(|f| format!("authConfig.{f}")),
            ),
            None => missing.push("authConfig".to_string()),
        }
        match &self.api_call {
            Some(call) => missing.extend(
                call.missing_fields()
                    .into_iter()
                    .map(|f| format!("apiCall.{f}")),
            ),
            None => missing.push("apiCall".to_string()),
        }
        missing
    }
}

/// `POST /authenticated-api-call` success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedApiCallResponse {
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ResponseDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetails {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub timing: ResponseTiming,
    pub url: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTiming {
    /// Milliseconds between sending the request and reading the body.
    pub request_duration: u64,
    /// RFC 3339 completion time.
    pub timestamp: String,
}

/// Error body returned by every relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `GET /connection-health` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHealth {
    pub connected: bool,
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Milliseconds since the last heartbeat response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_ms_ago: Option<u64>,
    pub pending_requests: usize,
    pub uptime_secs: u64,
    pub timestamp: String,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
