//! HTTP route definitions.
//!
//! ```text
//! GET  /.identity                 - Relay identity (signature, port, version)
//! GET  /.port                     - Bound port as plain text
//! GET  /connection-health         - Extension channel health
//!
//! POST /capture-screenshot        - Screenshot via the extension, filed to disk
//! POST /auth-token-proxy          - Token read by the extension
//! POST /authenticated-api-call    - Token read + outbound API call
//! POST /screenshot                - Screenshot pushed by the extension
//!
//! POST /extension-log             - Log ingestion
//! GET  /console-logs, /console-errors, /network-errors, /network-success, /all-xhr
//! GET  /network-request-details   - Filtered projection of the network cache
//! GET|POST /selected-element
//! GET|POST /current-url
//! POST /wipelogs
//!
//! GET  /extension-ws              - Extension WebSocket
//! ```

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::http::{identity, logs, relay};
use crate::state::RelayState;
use crate::websocket::extension_ws_handler;

/// Screenshots arrive as base64 bodies well above axum's 2 MB default.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub fn create_router(state: Arc<RelayState>) -> Router {
    let identity_routes = Router::new()
        .route("/.identity", get(identity::identity))
        .route("/.port", get(identity::port))
        .route("/connection-health", get(identity::connection_health))
        .with_state(state.clone());

    let relay_routes = Router::new()
        .route("/capture-screenshot", post(relay::capture_screenshot))
        .route("/auth-token-proxy", post(relay::auth_token_proxy))
        .route("/authenticated-api-call", post(relay::authenticated_api_call))
        .route("/screenshot", post(relay::save_screenshot))
        .with_state(state.clone());

    let log_routes = Router::new()
        .route("/extension-log", post(logs::extension_log))
        .route("/console-logs", get(logs::console_logs))
        .route("/console-errors", get(logs::console_errors))
        .route("/network-errors", get(logs::network_errors))
        .route("/network-success", get(logs::network_success))
        .route("/all-xhr", get(logs::all_xhr))
        .route("/network-request-details", get(logs::network_request_details))
        .route(
            "/selected-element",
            get(logs::selected_element).post(logs::set_selected_element),
        )
        .route(
            "/current-url",
            get(logs::current_url).post(logs::update_current_url),
        )
        .route("/wipelogs", post(logs::wipe_logs))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/extension-ws", get(extension_ws_handler))
        .with_state(state);

    Router::new()
        .merge(identity_routes)
        .merge(relay_routes)
        .merge(log_routes)
        .merge(ws_route)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
