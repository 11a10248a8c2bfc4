use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn spec(base_url: &str, endpoint: &str, method: &str) -> ApiCallSpec {
    ApiCallSpec {
        base_url: Some(base_url.to_string()),
        endpoint: Some(endpoint.to_string()),
        method: method.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_full_url_appends_query() {
    let mut call = spec("https://api.example.com", "/users", "GET");
    assert_eq!(full_url(&call), "https://api.example.com/users");

    call.query_params = Some(BTreeMap::from([
        ("page".to_string(), "2".to_string()),
        ("q".to_string(), "a b".to_string()),
    ]));
    assert_eq!(full_url(&call), "https://api.example.com/users?page=2&q=a+b");
}

#[tokio::test]
async fn test_get_sends_bearer_token_and_parses_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("page", "2"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let mut call = spec(&server.uri(), "/users", "get");
    call.query_params = Some(BTreeMap::from([("page".to_string(), "2".to_string())]));

    let caller = ApiCaller::new(Client::new());
    let response = caller.call("tok-123", &call, true).await.unwrap();

    assert_eq!(response.data, json!([{"id": 1}]));
    let details = response.details.unwrap();
    assert_eq!(details.status, 200);
    assert_eq!(details.status_text, "OK");
    assert_eq!(details.method, "get");
    assert_eq!(details.url, format!("{}/users?page=2", server.uri()));
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_json(json!({"sku": "A1", "qty": 2})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "o-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut call = spec(&server.uri(), "/orders", "POST");
    call.request_body = Some(json!({"sku": "A1", "qty": 2}));

    let response = ApiCaller::new(Client::new())
        .call("t", &call, false)
        .await
        .unwrap();
    assert_eq!(response.data, json!({"id": "o-1"}));
    assert!(response.details.is_none());
}

#[tokio::test]
async fn test_additional_headers_override_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .and(header("content-type", "text/plain"))
        .and(header("x-tenant", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
        .expect(1)
        .mount(&server)
        .await;

    let mut call = spec(&server.uri(), "/raw", "GET");
    call.additional_headers = Some(BTreeMap::from([
        ("Content-Type".to_string(), "text/plain".to_string()),
        ("X-Tenant".to_string(), "acme".to_string()),
    ]));

    let response = ApiCaller::new(Client::new())
        .call("t", &call, true)
        .await
        .unwrap();
    assert_eq!(response.data, json!("plain text"));
}

#[tokio::test]
async fn test_upstream_error_status_is_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "forbidden"})))
        .mount(&server)
        .await;

    let response = ApiCaller::new(Client::new())
        .call("t", &spec(&server.uri(), "/secret", "GET"), true)
        .await
        .unwrap();
    assert_eq!(response.data["message"], "forbidden");
    assert_eq!(response.details.unwrap().status, 403);
}

#[tokio::test]
async fn test_invalid_method_is_bad_request() {
    let err = ApiCaller::new(Client::new())
        .call("t", &spec("http://127.0.0.1:1", "/x", "GE T"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
}
