use super::*;
use relay_config::RelayConfig;
use relay_protocols::ServerIdentity;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock relay that answers discovery, plus an adapter pointed at it.
async fn mock_relay() -> (MockServer, Arc<RelayAdapter>) {
    let server = MockServer::start().await;
    let port = server.address().port();
    Mock::given(method("GET"))
        .and(path("/.identity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ServerIdentity::new(port)))
        .mount(&server)
        .await;

    let mut config = RelayConfig::default();
    config.server.port_file = String::new();
    config.discovery.port = Some(port);
    (server, Arc::new(RelayAdapter::new(&config)))
}

#[tokio::test]
async fn test_analyze_api_calls_forwards_filters() {
    let (server, adapter) = mock_relay().await;
    Mock::given(method("GET"))
        .and(path("/network-request-details"))
        .and(query_param("urlFilter", "activity"))
        .and(query_param("details", "url,status"))
        .and(query_param("includeTimestamp", "true"))
        .and(query_param("orderBy", "timestamp"))
        .and(query_param("orderDirection", "asc"))
        .and(query_param("limit", "5"))
        .and(query_param("timeStart", "1700000000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"url": "/api/activity/1", "status": 200, "timestamp": 1700000000500i64}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let result = AnalyzeApiCallsTool::new(adapter)
        .execute(json!({
            "urlFilter": "activity",
            "details": ["url", "status"],
            "timeStart": 1700000000000i64,
            "orderDirection": "asc",
            "limit": 5
        }))
        .await
        .unwrap();

    assert!(!result.is_error);
    let parsed: Value = serde_json::from_str(&result.joined_text()).unwrap();
    assert_eq!(parsed[0]["url"], "/api/activity/1");
}

#[tokio::test]
async fn test_analyze_api_calls_suggests_when_empty() {
    let (server, adapter) = mock_relay().await;
    Mock::given(path("/network-request-details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = AnalyzeApiCallsTool::new(adapter)
        .execute(json!({"urlFilter": "Orders", "details": ["url"]}))
        .await
        .unwrap();

    let text = result.joined_text();
    assert!(text.starts_with("No API calls found matching 'Orders'. Try these search strategies:\n\n"));
    assert!(text.contains("Try singular form: \"order\""));
}

#[tokio::test]
async fn test_analyze_api_calls_relay_rejection_is_not_retried() {
    let (server, adapter) = mock_relay().await;
    Mock::given(path("/network-request-details"))
        .respond_with(ResponseTemplate::new(400).set_body_string("urlFilter is required"))
        .expect(1)
        .mount(&server)
        .await;

    let result = AnalyzeApiCallsTool::new(adapter)
        .execute(json!({"urlFilter": "x", "details": ["url"]}))
        .await
        .unwrap();

    assert!(result.is_error);
    assert_eq!(
        result.joined_text(),
        "Failed to get network request details: Server returned 400: urlFilter is required"
    );
}

#[tokio::test]
async fn test_analyze_api_calls_rejects_unknown_details() {
    let adapter = Arc::new(RelayAdapter::new(&RelayConfig::default()));
    let err = AnalyzeApiCallsTool::new(adapter)
        .execute(json!({"urlFilter": "x", "details": ["url", "cookies"]}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid details: cookies"));
}

#[test]
fn test_search_suggestions() {
    let plural = generate_search_suggestions("user");
    assert_eq!(plural[0], "🔍 **Search Strategy Suggestions:**");
    assert_eq!(plural[1], "   • Try plural form: \"users\"");
    assert_eq!(plural[2], "   • Try partial match: \"use\"");
    assert_eq!(plural[3], "");
    assert_eq!(plural.len(), 10);

    let singular = generate_search_suggestions("Activities");
    assert_eq!(singular[1], "   • Try singular form: \"activitie\"");
    assert_eq!(singular[2], "   • Try partial match: \"activiti\"");

    let short = generate_search_suggestions("ab");
    assert_eq!(short[2], "   • Try partial match: \"ab\"");
}

#[tokio::test]
async fn test_take_screenshot_returns_summary_and_image() {
    let (server, adapter) = mock_relay().await;
    Mock::given(method("POST"))
        .and(path("/capture-screenshot"))
        .and(body_json(json!({"returnImageData": true, "projectName": "shop"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filePath": "/shots/shop/cart/2024_shot.png",
            "filename": "2024_shot.png",
            "projectDirectory": "shop",
            "urlCategory": "cart",
            "imageData": "iVBORw0KGgo="
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = TakeScreenshotTool::new(adapter)
        .execute(json!({"projectName": "shop"}))
        .await
        .unwrap();

    assert_eq!(result.content.len(), 2);
    assert_eq!(
        result.content[0],
        Content::text(
            "✅ Screenshot captured successfully!\n📁 Project: shop\n📂 Category: cart\n💾 Saved to: /shots/shop/cart/2024_shot.png"
        )
    );
    assert_eq!(result.content[1], Content::image("iVBORw0KGgo=", "image/png"));
}

#[tokio::test]
async fn test_take_screenshot_without_image_data() {
    let (server, adapter) = mock_relay().await;
    Mock::given(path("/capture-screenshot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filePath": "",
            "filename": "x.png",
            "projectDirectory": "",
            "urlCategory": "general",
            "imageData": "AAAA"
        })))
        .mount(&server)
        .await;

    let result = TakeScreenshotTool::new(adapter)
        .execute(json!({"returnImageData": false}))
        .await
        .unwrap();

    assert_eq!(result.content.len(), 1);
    let text = result.joined_text();
    assert!(text.contains("📁 Project: default-project"));
    assert!(text.contains("💾 Saved to: browser extension panel"));
}

#[tokio::test]
async fn test_take_screenshot_relay_error() {
    let (server, adapter) = mock_relay().await;
    Mock::given(path("/capture-screenshot"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"error": "Chrome extension not connected"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = TakeScreenshotTool::new(adapter)
        .execute(Value::Null)
        .await
        .unwrap();
    assert!(result.is_error);
    assert_eq!(
        result.joined_text(),
        "Error taking screenshot: Chrome extension not connected"
    );
}

#[tokio::test]
async fn test_log_tools_hit_their_endpoints() {
    let (server, adapter) = mock_relay().await;
    Mock::given(method("GET"))
        .and(path("/console-errors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"type": "console-error", "message": "boom"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tools = LogQueryTool::all(adapter);
    let errors = tools
        .iter()
        .find(|t| t.definition().name == "getConsoleErrors")
        .unwrap();
    assert_eq!(errors.path(), "/console-errors");

    let result = errors.execute(json!({})).await.unwrap();
    assert!(result.joined_text().contains("\"message\": \"boom\""));
}

#[tokio::test]
async fn test_selected_element_and_wipe() {
    let (server, adapter) = mock_relay().await;
    Mock::given(method("GET"))
        .and(path("/selected-element"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tagName": "BUTTON"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wipelogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": "All logs cleared successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let element = GetSelectedElementTool::new(adapter.clone())
        .execute(Value::Null)
        .await
        .unwrap();
    assert_eq!(element.joined_text(), "{\n  \"tagName\": \"BUTTON\"\n}");

    let wiped = WipeLogsTool::new(adapter).execute(Value::Null).await.unwrap();
    assert_eq!(wiped.joined_text(), "All logs cleared successfully");
}
