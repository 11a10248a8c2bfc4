//! Log ingestion and query handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::parse_body;
use crate::error::ApiError;
use crate::logs::{Ingested, LogKind, NetworkQueryParams};
use crate::state::RelayState;

fn rejected(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}

fn ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /extension-log`
pub async fn extension_log(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: Value = parse_body(&body)?;
    if let Some(settings) = body.get("settings").filter(|s| s.is_object()) {
        state.logs.update_settings(settings);
    }
    let Some(data) = body.get("data").filter(|d| !d.is_null()).cloned() else {
        return Ok(rejected("No data provided"));
    };

    match state.logs.ingest(data) {
        Ingested::PageNavigated {
            url: Some(url),
            tab_id,
        } => {
            info!("Page navigated to {}", url);
            state.bridge.set_page(url, tab_id);
        }
        Ingested::Unknown(kind) => debug!("Extension log with unhandled type {:?}", kind),
        _ => {}
    }
    Ok(ok().into_response())
}

pub async fn console_logs(State(state): State<Arc<RelayState>>) -> Json<Vec<Value>> {
    Json(state.logs.query(LogKind::ConsoleLogs))
}

pub async fn console_errors(State(state): State<Arc<RelayState>>) -> Json<Vec<Value>> {
    Json(state.logs.query(LogKind::ConsoleErrors))
}

pub async fn network_errors(State(state): State<Arc<RelayState>>) -> Json<Vec<Value>> {
    Json(state.logs.query(LogKind::NetworkErrors))
}

pub async fn network_success(State(state): State<Arc<RelayState>>) -> Json<Vec<Value>> {
    Json(state.logs.query(LogKind::NetworkSuccess))
}

/// `GET /all-xhr`: success and error entries merged by timestamp.
pub async fn all_xhr(State(state): State<Arc<RelayState>>) -> Json<Vec<Value>> {
    Json(state.logs.all_xhr())
}

/// `GET /selected-element`
pub async fn selected_element(State(state): State<Arc<RelayState>>) -> Json<Value> {
    Json(
        state
            .logs
            .selected_element()
            .unwrap_or_else(|| json!({ "message": "No element selected" })),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectedElementUpdate {
    #[serde(default)]
    pub data: Option<Value>,
}

/// `POST /selected-element`
pub async fn set_selected_element(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let update: SelectedElementUpdate = parse_body(&body)?;
    state
        .logs
        .set_selected_element(update.data.filter(|d| !d.is_null()));
    Ok(ok())
}

/// `POST /wipelogs`
pub async fn wipe_logs(State(state): State<Arc<RelayState>>) -> Json<Value> {
    state.logs.wipe();
    info!("All logs cleared");
    Json(json!({ "status": "ok", "message": "All logs cleared successfully" }))
}

/// `GET /current-url`
pub async fn current_url(State(state): State<Arc<RelayState>>) -> Json<Value> {
    let page = state.bridge.page();
    Json(json!({ "url": page.url, "tabId": page.tab_id }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUrlUpdate {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tab_id: Option<Value>,
}

/// `POST /current-url`
pub async fn update_current_url(
    State(state): State<Arc<RelayState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let update: CurrentUrlUpdate = parse_body(&body)?;
    let Some(url) = update.url.filter(|u| !u.is_empty()) else {
        return Ok(rejected("No URL provided"));
    };

    let previous = state.bridge.set_page(url.clone(), update.tab_id);
    let updated = previous.url.as_deref() != Some(url.as_str());
    if updated {
        debug!("Current URL now {}", url);
    }
    let page = state.bridge.page();
    Ok(Json(json!({
        "status": "ok",
        "url": url,
        "tabId": page.tab_id,
        "previousUrl": previous.url,
        "updated": updated,
    }))
    .into_response())
}

/// `GET /network-request-details`
pub async fn network_request_details(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<NetworkQueryParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let query = params.parse().map_err(ApiError::BadRequest)?;
    Ok(Json(state.logs.network_details(&query)))
}
