//! Tools exposed over MCP.
//!
//! Relay-backed tools go through [`RelayAdapter::with_connection`]; the
//! image and API-documentation tools work locally.

mod api;
mod api_docs;
mod browser;
mod image;

use std::sync::Arc;

use async_trait::async_trait;
use relay_config::ApiConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::adapter::RelayAdapter;
use crate::error::ToolError;
use crate::protocol::{ToolDefinition, ToolResult};

pub use api::ExecuteAuthenticatedApiCallTool;
pub use api_docs::{SearchApiDocsTool, find_matching_endpoints, generate_api_suggestions};
pub use browser::{
    AnalyzeApiCallsTool, GetSelectedElementTool, LogQueryTool, TakeScreenshotTool, WipeLogsTool,
    generate_search_suggestions,
};
pub use image::AnalyzeImageFileTool;

#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    /// Run the tool. Failures the assistant should see are `Ok` results with
    /// `isError` set; `Err` is reserved for unusable arguments.
    async fn execute(&self, params: Value) -> Result<ToolResult, ToolError>;
}

/// Tools in registration order, looked up by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        self.tools.retain(|t| t.definition().name != name);
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.definition().name == name)
            .cloned()
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Every browser-relay tool, wired to `adapter` and the API settings.
pub fn default_registry(adapter: Arc<RelayAdapter>, api: &ApiConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(AnalyzeApiCallsTool::new(adapter.clone())));
    registry.register(Arc::new(TakeScreenshotTool::new(adapter.clone())));
    registry.register(Arc::new(GetSelectedElementTool::new(adapter.clone())));
    for tool in LogQueryTool::all(adapter.clone()) {
        registry.register(Arc::new(tool));
    }
    registry.register(Arc::new(WipeLogsTool::new(adapter.clone())));
    registry.register(Arc::new(ExecuteAuthenticatedApiCallTool::new(
        adapter,
        api.clone(),
    )));
    registry.register(Arc::new(AnalyzeImageFileTool::new(api.project_root.clone())));
    registry.register(Arc::new(SearchApiDocsTool::new(api.swagger_url.clone())));
    registry
}

/// Deserialize tool arguments; absent arguments read as `{}`.
pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

pub(crate) fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
