use super::*;
use serde_json::json;

#[test]
fn test_request_without_id_is_notification() {
    let req: RpcRequest =
        serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
    assert!(req.is_notification());
    assert!(req.params.is_none());
}

#[test]
fn test_request_id_variants() {
    let req: RpcRequest =
        serde_json::from_str(r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#).unwrap();
    assert_eq!(req.id, Some(RequestId::String("abc".to_string())));

    let req = RpcRequest::new(7i64, "tools/list");
    assert_eq!(req.id, Some(RequestId::Number(7)));
}

#[test]
fn test_parse_error_response_has_null_id() {
    let resp = RpcResponse::error(None, RpcError::parse_error("expected value"));
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["id"], serde_json::Value::Null);
    assert_eq!(json["error"]["code"], -32700);
    assert!(json.get("result").is_none());
}

#[test]
fn test_error_codes() {
    assert_eq!(RpcError::invalid_request("x").code, -32600);
    assert_eq!(RpcError::method_not_found("x").code, -32601);
    assert_eq!(RpcError::invalid_params("x").code, -32602);
    assert_eq!(RpcError::internal_error("x").code, -32603);
}

#[test]
fn test_tool_definition_uses_input_schema_key() {
    let def = ToolDefinition::new("getSelectedElement", "Selected element");
    let json = serde_json::to_value(&def).unwrap();
    assert_eq!(json["inputSchema"]["type"], "object");
}

#[test]
fn test_image_content_wire_shape() {
    let result = ToolResult::text("✅ done").with_content(Content::image("AAAA", "image/png"));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json,
        json!({
            "content": [
                {"type": "text", "text": "✅ done"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"}
            ],
            "isError": false
        })
    );
}

#[test]
fn test_joined_text_skips_images() {
    let result = ToolResult::error("first")
        .with_content(Content::image("AAAA", "image/png"))
        .with_content(Content::text("second"));
    assert!(result.is_error);
    assert_eq!(result.joined_text(), "first\nsecond");
}
