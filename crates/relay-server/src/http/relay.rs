//! Endpoints that round-trip through the extension.
//!
//! Each one validates its body, checks for a live channel, sends one
//! correlated request and shapes the reply.

use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};
use relay_protocols::{
    AuthConfig, AuthTokenResponse, AuthenticatedApiCallRequest, AuthenticatedApiCallResponse,
    CaptureScreenshotRequest, CaptureScreenshotResponse, RelayError, TokenRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::parse_body;
use crate::channel::RelayRequest;
use crate::error::ApiError;
use crate::screenshot::SaveOptions;
use crate::state::RelayState;

const EXTENSION_NOT_CONNECTED: &str = "Chrome extension not connected";
const NO_SCREENSHOT_DATA: &str = "No screenshot data received from Chrome extension";

/// `POST /capture-screenshot`
pub async fn capture_screenshot(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Json<CaptureScreenshotResponse>, ApiError> {
    let request: CaptureScreenshotRequest = parse_body(&body)?;
    if !state.bridge.has_active_connection() {
        return Err(ApiError::Unavailable(EXTENSION_NOT_CONNECTED.to_string()));
    }

    let reply = state.bridge.request(RelayRequest::CaptureScreenshot).await?;
    let data = reply
        .get("data")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ApiError::Internal(NO_SCREENSHOT_DATA.to_string()))?;
    let extension_path = reply
        .get("path")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    let page = state.bridge.page();
    let saved = state
        .screenshots
        .save(
            data,
            page.url.as_deref(),
            SaveOptions {
                filename: request.filename,
                project_name: request.project_name,
                base_directory: extension_path,
                return_image_data: request.return_image_data,
            },
        )
        .await?;
    Ok(Json(saved.into()))
}

/// `POST /auth-token-proxy`
pub async fn auth_token_proxy(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Json<AuthTokenResponse>, ApiError> {
    let config: AuthConfig = parse_body(&body)?;
    let token_request = config.validate().map_err(ApiError::BadRequest)?;
    let token = retrieve_token(&state, token_request).await?;
    Ok(Json(AuthTokenResponse { token }))
}

/// `POST /authenticated-api-call`
pub async fn authenticated_api_call(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Json<AuthenticatedApiCallResponse>, ApiError> {
    let request: AuthenticatedApiCallRequest = parse_body(&body)?;
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    let (Some(auth), Some(api_call)) = (&request.auth_config, &request.api_call) else {
        return Err(ApiError::BadRequest(
            "Missing required fields: authConfig, apiCall".to_string(),
        ));
    };
    let token_request = auth.validate().map_err(ApiError::BadRequest)?;
    api_call.validate_method().map_err(ApiError::BadRequest)?;

    let token = retrieve_token(&state, token_request).await?;
    let response = state
        .api
        .call(&token, api_call, request.options.include_response_details)
        .await?;
    Ok(Json(response))
}

async fn retrieve_token(state: &RelayState, request: TokenRequest) -> Result<String, ApiError> {
    if !state.bridge.has_active_connection() {
        return Err(RelayError::ConnectionUnavailable.into());
    }
    info!("Retrieving auth token from {}", request.origin);
    let reply = state
        .bridge
        .request(RelayRequest::RetrieveAuthToken(request))
        .await?;
    match reply {
        Value::String(token) if !token.is_empty() => Ok(token),
        other => {
            warn!("Extension returned no usable token: {}", other);
            Err(ApiError::Internal("No token received from Chrome extension".to_string()))
        }
    }
}

/// `POST /screenshot` body, posted by the extension directly.
#[derive(Debug, Default, Deserialize)]
pub struct ScreenshotUpload {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotSaved {
    pub path: String,
    pub filename: String,
    pub project_directory: String,
    pub url_category: String,
}

/// `POST /screenshot`
pub async fn save_screenshot(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Json<ScreenshotSaved>, ApiError> {
    let upload: ScreenshotUpload = parse_body(&body)?;
    let data = upload
        .data
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing screenshot data".to_string()))?;

    let url = upload.url.or_else(|| state.bridge.page().url);
    let saved = state
        .screenshots
        .save(
            &data,
            url.as_deref(),
            SaveOptions {
                base_directory: upload.path,
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(ScreenshotSaved {
        path: saved.file_path.display().to_string(),
        filename: saved.filename,
        project_directory: saved.project_directory,
        url_category: saved.url_category,
    }))
}
