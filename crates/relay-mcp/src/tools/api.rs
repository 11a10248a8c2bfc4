//! `executeAuthenticatedApiCall`: an API request made with the page's own
//! auth token, fetched by the relay from the browser.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use relay_config::ApiConfig;
use relay_protocols::{ApiCallOptions, ApiCallSpec, AuthConfig, AuthenticatedApiCallRequest};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{Tool, parse_params, pretty};
use crate::adapter::RelayAdapter;
use crate::error::ToolError;
use crate::protocol::{Content, ToolDefinition, ToolResult};

const METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

const MISSING_CONFIG: &str = "Missing required environment variables. Please set: AUTH_ORIGIN, AUTH_STORAGE_TYPE, AUTH_TOKEN_KEY, and API_BASE_URL";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCallParams {
    endpoint: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    request_body: Option<Value>,
    #[serde(default)]
    query_params: Option<BTreeMap<String, String>>,
    #[serde(default)]
    additional_headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    include_response_details: Option<bool>,
}

/// Auth and base URL settings, present and non-empty.
struct ResolvedApi<'a> {
    origin: &'a str,
    storage_type: &'a str,
    token_key: &'a str,
    base_url: &'a str,
}

fn resolve(api: &ApiConfig) -> Option<ResolvedApi<'_>> {
    Some(ResolvedApi {
        origin: non_empty(&api.auth_origin)?,
        storage_type: non_empty(&api.auth_storage_type)?,
        token_key: non_empty(&api.auth_token_key)?,
        base_url: non_empty(&api.api_base_url)?,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub struct ExecuteAuthenticatedApiCallTool {
    definition: ToolDefinition,
    adapter: Arc<RelayAdapter>,
    api: ApiConfig,
}

impl ExecuteAuthenticatedApiCallTool {
    pub fn new(adapter: Arc<RelayAdapter>, api: ApiConfig) -> Self {
        let definition = ToolDefinition::new(
            "executeAuthenticatedApiCall",
            "Execute authenticated API calls and get real response data. Use this to test API \
             endpoints with actual authentication and understand the real response structure. \
             Call this after using searchApiDocs to validate endpoints with live data.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "endpoint": {
                    "type": "string",
                    "description": "API endpoint path (e.g. '/api/users'), appended to API_BASE_URL"
                },
                "method": {"type": "string", "enum": METHODS, "default": "GET"},
                "requestBody": {
                    "description": "JSON body for POST/PUT/PATCH requests"
                },
                "queryParams": {
                    "type": "object",
                    "additionalProperties": {"type": "string"}
                },
                "additionalHeaders": {
                    "type": "object",
                    "additionalProperties": {"type": "string"}
                },
                "includeResponseDetails": {
                    "type": "boolean",
                    "default": true,
                    "description": "Include status, headers and timing"
                }
            },
            "required": ["endpoint"]
        }));
        Self {
            definition,
            adapter,
            api,
        }
    }
}

#[async_trait]
impl Tool for ExecuteAuthenticatedApiCallTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let params: ApiCallParams = parse_params(params)?;
        let method = params.method.as_deref().unwrap_or("GET").to_uppercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(ToolError::InvalidParameters(format!(
                "method must be one of {}",
                METHODS.join(", ")
            )));
        }

        let Some(api) = resolve(&self.api) else {
            return Ok(ToolResult::error(MISSING_CONFIG));
        };

        let include_details = params.include_response_details.unwrap_or(true);
        let request = AuthenticatedApiCallRequest {
            auth_config: Some(AuthConfig {
                origin: Some(api.origin.to_string()),
                storage_type: Some(api.storage_type.to_string()),
                token_key: Some(api.token_key.to_string()),
            }),
            api_call: Some(ApiCallSpec {
                base_url: Some(api.base_url.to_string()),
                endpoint: Some(params.endpoint.clone()),
                method: method.clone(),
                request_body: params.request_body.clone(),
                query_params: params.query_params.clone(),
                additional_headers: Some(params.additional_headers.clone().unwrap_or_default()),
            }),
            options: ApiCallOptions {
                include_response_details: include_details,
            },
        };
        debug!(
            "executeAuthenticatedApiCall {} {} (auth origin {})",
            method, params.endpoint, api.origin
        );

        let request = &request;
        let heading = format!(
            "✅ API Call Successful: {} {}{}",
            method, api.base_url, params.endpoint
        );
        let heading = heading.as_str();

        Ok(self
            .adapter
            .with_connection(|relay| async move {
                let response = relay.post("/authenticated-api-call", request).await?;
                let body = match response.json() {
                    Ok(body) => body,
                    Err(e) => {
                        return Ok(ToolResult::error(format!(
                            "Error executing authenticated API call: {}",
                            e
                        )));
                    }
                };
                if !response.is_success() {
                    let error = body.get("error").and_then(Value::as_str).unwrap_or("Unknown error");
                    return Ok(ToolResult::error(format!(
                        "Failed to execute authenticated API call: {}",
                        error
                    )));
                }
                Ok(api_call_result(heading, &body, include_details))
            })
            .await)
    }
}

fn api_call_result(heading: &str, body: &Value, include_details: bool) -> ToolResult {
    let mut result = ToolResult::text(heading);
    if include_details {
        if let Some(details) = body.get("details").filter(|d| !d.is_null()) {
            let summary = json!({
                "status": details.get("status"),
                "statusText": details.get("statusText"),
                "headers": details.get("headers"),
                "timing": details.get("timing"),
            });
            result = result.with_content(Content::text(format!(
                "📊 Response Details:\n{}",
                pretty(&summary)
            )));
        }
    }
    let data = body.get("data").cloned().unwrap_or(Value::Null);
    result.with_content(Content::text(format!("📄 Response Data:\n{}", pretty(&data))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_config::RelayConfig;
    use relay_protocols::ServerIdentity;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_config() -> ApiConfig {
        ApiConfig {
            auth_origin: Some("http://localhost:5173".to_string()),
            auth_storage_type: Some("localStorage".to_string()),
            auth_token_key: Some("authToken".to_string()),
            api_base_url: Some("https://api.example.com".to_string()),
            ..Default::default()
        }
    }

    async fn relay_with_identity() -> (MockServer, Arc<RelayAdapter>) {
        let server = MockServer::start().await;
        let port = server.address().port();
        Mock::given(path("/.identity"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ServerIdentity::new(port)))
            .mount(&server)
            .await;
        let mut config = RelayConfig::default();
        config.server.port_file = String::new();
        config.discovery.port = Some(port);
        (server, Arc::new(RelayAdapter::new(&config)))
    }

    #[tokio::test]
    async fn test_missing_configuration_skips_the_relay() {
        let (server, adapter) = relay_with_identity().await;
        let mut api = api_config();
        api.api_base_url = None;

        let result = ExecuteAuthenticatedApiCallTool::new(adapter, api)
            .execute(json!({"endpoint": "/users"}))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(result.joined_text(), MISSING_CONFIG);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_call_is_formatted() {
        let (server, adapter) = relay_with_identity().await;
        Mock::given(method("POST"))
            .and(path("/authenticated-api-call"))
            .and(body_json(json!({
                "authConfig": {
                    "origin": "http://localhost:5173",
                    "storageType": "localStorage",
                    "tokenKey": "authToken"
                },
                "apiCall": {
                    "baseUrl": "https://api.example.com",
                    "endpoint": "/users",
                    "method": "POST",
                    "requestBody": {"name": "Ada"},
                    "additionalHeaders": {}
                },
                "options": {"includeResponseDetails": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": 7},
                "details": {
                    "status": 201,
                    "statusText": "Created",
                    "headers": {"content-type": "application/json"},
                    "timing": {"requestDuration": 12, "timestamp": "2024-01-01T00:00:00Z"},
                    "url": "https://api.example.com/users",
                    "method": "POST"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = ExecuteAuthenticatedApiCallTool::new(adapter, api_config())
            .execute(json!({
                "endpoint": "/users",
                "method": "post",
                "requestBody": {"name": "Ada"}
            }))
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 3);
        assert_eq!(
            result.content[0],
            Content::text("✅ API Call Successful: POST https://api.example.com/users")
        );
        let text = result.joined_text();
        assert!(text.contains("📊 Response Details:\n{"));
        assert!(text.contains("\"statusText\": \"Created\""));
        assert!(!text.contains("\"url\": \"https://api.example.com/users\""));
        assert!(text.ends_with("📄 Response Data:\n{\n  \"id\": 7\n}"));
    }

    #[tokio::test]
    async fn test_relay_failure_is_reported() {
        let (server, adapter) = relay_with_identity().await;
        Mock::given(path("/authenticated-api-call"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": "No active browser connection available"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = ExecuteAuthenticatedApiCallTool::new(adapter, api_config())
            .execute(json!({"endpoint": "/users", "includeResponseDetails": false}))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(
            result.joined_text(),
            "Failed to execute authenticated API call: No active browser connection available"
        );
    }

    #[tokio::test]
    async fn test_unknown_method_is_invalid() {
        let adapter = Arc::new(RelayAdapter::new(&RelayConfig::default()));
        let err = ExecuteAuthenticatedApiCallTool::new(adapter, api_config())
            .execute(json!({"endpoint": "/users", "method": "TRACE"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[test]
    fn test_details_block_is_skipped_when_disabled() {
        let body = json!({"data": [1, 2], "details": {"status": 200}});
        let result = api_call_result("heading", &body, false);
        assert_eq!(result.content.len(), 2);
    }
}
