//! End-to-end: a real listener, a simulated extension over WebSocket and
//! HTTP clients hitting the relay endpoints.

use std::time::Duration;

use relay_config::RelayConfig;
use relay_link::{ExtensionLink, LinkEvent};
use relay_protocols::{ExtensionMessage, ServerMessage};
use relay_server::RelayServer;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::oneshot;

const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

struct Harness {
    base: String,
    stop: Option<oneshot::Sender<()>>,
    server: tokio::task::JoinHandle<Result<(), relay_server::ServerError>>,
    _shots: TempDir,
    shots_path: std::path::PathBuf,
}

async fn start_relay() -> Harness {
    let shots = TempDir::new().unwrap();
    let mut config = RelayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.port_file = String::new();
    config.relay.heartbeat_interval_secs = 3600;
    config.relay.heartbeat_timeout_secs = 7200;
    config.screenshots.storage_path = shots.path().display().to_string();
    config.screenshots.project_name = Some("e2e".to_string());

    let server = RelayServer::new(config);
    let listener = server.bind().await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (stop, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(server.serve(listener, async move {
        let _ = stop_rx.await;
    }));

    Harness {
        base: format!("http://127.0.0.1:{}", port),
        stop: Some(stop),
        server,
        shots_path: shots.path().to_path_buf(),
        _shots: shots,
    }
}

async fn health(base: &str) -> Value {
    reqwest::get(format!("{}/connection-health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// Wait until the relay reports `connection_id`-style attachment different from `previous`.
async fn wait_for_connection(base: &str, previous: Option<&str>) -> String {
    for _ in 0..100 {
        let body = health(base).await;
        if let Some(id) = body["connectionId"].as_str() {
            if Some(id) != previous {
                return id.to_string();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("extension never attached");
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_screenshot_through_extension_link() {
    let relay = start_relay().await;
    let mut link = ExtensionLink::connect(&relay.base).await.unwrap();
    wait_for_connection(&relay.base, None).await;

    link.send(&ExtensionMessage::PageNavigated {
        url: Some("http://localhost:3000/checkout/step1".to_string()),
        tab_id: Some(json!(4)),
    })
    .await
    .unwrap();

    let base = relay.base.clone();
    let call = tokio::spawn(async move {
        post(&base, "/capture-screenshot", json!({ "filename": "checkout" })).await
    });

    let request_id = match link.next_message().await {
        Some(ServerMessage::TakeScreenshot { request_id }) => request_id,
        other => panic!("expected take-screenshot, got {other:?}"),
    };
    link.send(&ExtensionMessage::ScreenshotData {
        request_id: Some(request_id),
        data: format!("data:image/png;base64,{PNG_1X1}"),
        path: None,
        auto_paste: false,
    })
    .await
    .unwrap();

    let (status, body) = call.await.unwrap();
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["projectDirectory"], "e2e");
    assert_eq!(body["urlCategory"], "checkout");
    assert_eq!(body["imageData"], PNG_1X1);

    let file_path = std::path::PathBuf::from(body["filePath"].as_str().unwrap());
    assert!(file_path.starts_with(relay.shots_path.join("e2e").join("checkout")));
    assert!(file_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_screenshot_without_extension_is_503() {
    let relay = start_relay().await;
    let (status, body) = post(&relay.base, "/capture-screenshot", json!({})).await;
    assert_eq!(status, 503);
    assert_eq!(body["error"], "Chrome extension not connected");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_link_replaces_old_one() {
    let relay = start_relay().await;
    let mut first = ExtensionLink::connect(&relay.base).await.unwrap();
    let first_id = wait_for_connection(&relay.base, None).await;

    let _second = ExtensionLink::connect(&relay.base).await.unwrap();
    let second_id = wait_for_connection(&relay.base, Some(&first_id)).await;
    assert_ne!(first_id, second_id);

    assert_eq!(
        first.next_event().await,
        Some(LinkEvent::Closed {
            code: Some(1000),
            reason: "New connection established".to_string()
        })
    );
    let body = health(&relay.base).await;
    assert_eq!(body["connected"], true);
    assert_eq!(body["connectionId"], second_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_extension_disconnect_fails_pending_request() {
    let relay = start_relay().await;
    let mut link = ExtensionLink::connect(&relay.base).await.unwrap();
    wait_for_connection(&relay.base, None).await;

    let base = relay.base.clone();
    let call = tokio::spawn(async move {
        post(
            &base,
            "/auth-token-proxy",
            json!({ "origin": "http://app", "storageType": "cookie", "tokenKey": "sid" }),
        )
        .await
    });

    match link.next_message().await {
        Some(ServerMessage::RetrieveAuthToken { token_key, .. }) => assert_eq!(token_key, "sid"),
        other => panic!("expected RETRIEVE_AUTH_TOKEN, got {other:?}"),
    }
    link.close("extension reloaded").await.unwrap();

    let (status, body) = call.await.unwrap();
    assert_eq!(status, 500);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("WebSocket connection lost [conn_")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_notifies_extension() {
    let mut relay = start_relay().await;
    let mut link = ExtensionLink::connect(&relay.base).await.unwrap();
    wait_for_connection(&relay.base, None).await;

    relay.stop.take().unwrap().send(()).unwrap();

    assert_eq!(link.next_message().await, Some(ServerMessage::ServerShutdown));
    assert_eq!(
        link.next_event().await,
        Some(LinkEvent::Closed {
            code: Some(1000),
            reason: "Server shutting down".to_string()
        })
    );
    relay.server.await.unwrap().unwrap();
}
