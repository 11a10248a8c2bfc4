//! Second step of `/authenticated-api-call`: the outbound request made with
//! the token the extension handed back.

use std::collections::BTreeMap;
use std::time::Instant;

use relay_protocols::{ApiCallSpec, AuthenticatedApiCallResponse, ResponseDetails, ResponseTiming};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::info;

use crate::error::ApiError;

/// Methods that carry a JSON request body.
const BODY_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];

pub struct ApiCaller {
    client: Client,
}

impl ApiCaller {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Perform `spec` with `token` as the bearer credential.
    ///
    /// Upstream error statuses are returned as data, not as failures.
    pub async fn call(
        &self,
        token: &str,
        spec: &ApiCallSpec,
        include_details: bool,
    ) -> Result<AuthenticatedApiCallResponse, ApiError> {
        let url = full_url(spec);
        let method_name = spec.method.to_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| ApiError::BadRequest(format!("Invalid HTTP method: {}", spec.method)))?;

        let headers = build_headers(token, spec.additional_headers.as_ref())?;
        let mut request = self.client.request(method, &url).headers(headers);
        if let Some(body) = &spec.request_body {
            if BODY_METHODS.contains(&method_name.as_str()) {
                request = request.body(body.to_string());
            }
        }

        info!("Making API call to {} {}", method_name, url);
        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("API request failed: {}", e)))?;

        let status = response.status();
        let response_headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let is_json = response_headers
            .get(CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.contains("application/json"));

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to read response body: {}", e)))?;
        let elapsed = started.elapsed();
        info!("API call completed with status {}", status.as_u16());

        let data = if is_json {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        let details = include_details.then(|| ResponseDetails {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: response_headers,
            timing: ResponseTiming {
                request_duration: elapsed.as_millis() as u64,
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            url,
            method: spec.method.clone(),
        });

        Ok(AuthenticatedApiCallResponse { data, details })
    }
}

/// `baseUrl + endpoint`, plus the query parameters when there are any.
pub fn full_url(spec: &ApiCallSpec) -> String {
    let mut url = format!(
        "{}{}",
        spec.base_url.as_deref().unwrap_or_default(),
        spec.endpoint.as_deref().unwrap_or_default()
    );
    if let Some(params) = spec.query_params.as_ref().filter(|p| !p.is_empty()) {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        url.push('?');
        url.push_str(&query);
    }
    url
}

fn build_headers(
    token: &str,
    additional: Option<&BTreeMap<String, String>>,
) -> Result<HeaderMap, ApiError> {
    let invalid = |name: &str| ApiError::BadRequest(format!("Invalid header: {}", name));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| invalid("Authorization"))?,
    );
    for (name, value) in additional.into_iter().flatten() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid(name))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid(name))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

#[cfg(test)]
#[path = "api_call_tests.rs"]
mod tests;
