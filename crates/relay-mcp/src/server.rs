//! MCP server loop: one JSON-RPC message per line on stdin, one response per
//! line on stdout. Notifications get no reply.

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::protocol::{JSONRPC_VERSION, PROTOCOL_VERSION, RequestId, RpcError, RpcResponse};
use crate::tools::ToolRegistry;

pub const SERVER_NAME: &str = "Frontend-development-tools";
pub const SERVER_VERSION: &str = "1.2.0";

/// A validated request. `id` is `None` for notifications.
struct Incoming {
    id: Option<RequestId>,
    method: String,
    params: Option<Value>,
}

pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one raw line. Returns the serialized response, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle(message).await?,
            Err(e) => RpcResponse::error(None, RpcError::parse_error(e)),
        };
        match serde_json::to_string(&response) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                warn!("Failed to encode response: {}", e);
                None
            }
        }
    }

    pub async fn handle(&self, message: Value) -> Option<RpcResponse> {
        let request = match parse_request(message) {
            Ok(request) => request,
            Err((id, error)) => return Some(RpcResponse::error(id, error)),
        };

        let Some(id) = request.id.clone() else {
            debug!("Notification: {}", request.method);
            return None;
        };

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(request.params).await,
            other => Err(RpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => RpcResponse::success(Some(id), result),
            Err(error) => RpcResponse::error(Some(id), error),
        })
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        })
    }

    fn handle_tools_list(&self) -> Value {
        json!({ "tools": self.registry.list() })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params = params.unwrap_or_else(|| json!({}));
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RpcError::invalid_params("tools/call requires non-empty field 'name'"))?;
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(Value::Object(args)) => Value::Object(args.clone()),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call field 'arguments' must be an object when provided",
                ));
            }
        };

        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| RpcError::invalid_params(ToolError::NotFound(name.to_string()).to_string()))?;

        info!("Calling tool {}", name);
        let result = tool
            .execute(arguments)
            .await
            .map_err(|e| RpcError::invalid_params(e.to_string()))?;
        if result.is_error {
            debug!("Tool {} returned an error: {}", name, result.joined_text());
        }
        serde_json::to_value(&result).map_err(|e| RpcError::internal_error(e.to_string()))
    }

    /// Serve until `reader` hits EOF.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                writer.write_all(response.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        debug!("Input closed, stopping MCP server");
        Ok(())
    }

    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        info!(
            "{} v{} serving {} tools on stdio",
            SERVER_NAME,
            SERVER_VERSION,
            self.registry.len()
        );
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}

fn parse_request(message: Value) -> Result<Incoming, (Option<RequestId>, RpcError)> {
    let Value::Object(mut object) = message else {
        return Err((None, RpcError::invalid_request("Request must be a JSON object")));
    };
    let id = match object.remove("id") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<RequestId>(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                return Err((
                    None,
                    RpcError::invalid_request("Request id must be a string or integer"),
                ));
            }
        },
    };
    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err((
            id,
            RpcError::invalid_request(format!("jsonrpc must be '{}'", JSONRPC_VERSION)),
        ));
    }
    let method = match object.get("method").and_then(Value::as_str) {
        Some(method) if !method.trim().is_empty() => method.trim().to_string(),
        _ => {
            return Err((
                id,
                RpcError::invalid_request("Request must include a non-empty method"),
            ));
        }
    };
    Ok(Incoming {
        id,
        method,
        params: object.remove("params"),
    })
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
