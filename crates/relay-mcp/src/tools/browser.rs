//! Tools that read browser state through the relay.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::{Tool, parse_params, pretty};
use crate::adapter::RelayAdapter;
use crate::error::ToolError;
use crate::protocol::{Content, ToolDefinition, ToolResult};

const NETWORK_DETAILS: [&str; 8] = [
    "url",
    "method",
    "status",
    "timestamp",
    "requestHeaders",
    "responseHeaders",
    "requestBody",
    "responseBody",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeApiCallsParams {
    url_filter: String,
    details: Vec<String>,
    #[serde(default)]
    time_start: Option<i64>,
    #[serde(default)]
    time_end: Option<i64>,
    #[serde(default)]
    order_by: Option<String>,
    #[serde(default)]
    order_direction: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

impl AnalyzeApiCallsParams {
    fn validate(&self) -> Result<(), ToolError> {
        if self.details.is_empty() {
            return Err(ToolError::InvalidParameters(
                "details must name at least one field".to_string(),
            ));
        }
        let invalid: Vec<&str> = self
            .details
            .iter()
            .map(String::as_str)
            .filter(|d| !NETWORK_DETAILS.contains(d))
            .collect();
        if !invalid.is_empty() {
            return Err(ToolError::InvalidParameters(format!(
                "Invalid details: {}. Valid options are: {}",
                invalid.join(", "),
                NETWORK_DETAILS.join(", ")
            )));
        }
        Ok(())
    }

    /// `/network-request-details` path with its query string.
    fn request_path(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("urlFilter", &self.url_filter)
            .append_pair("details", &self.details.join(","))
            .append_pair("includeTimestamp", "true");
        if let Some(start) = self.time_start.filter(|t| *t != 0) {
            query.append_pair("timeStart", &start.to_string());
        }
        if let Some(end) = self.time_end.filter(|t| *t != 0) {
            query.append_pair("timeEnd", &end.to_string());
        }
        query
            .append_pair("orderBy", self.order_by.as_deref().unwrap_or("timestamp"))
            .append_pair(
                "orderDirection",
                self.order_direction.as_deref().unwrap_or("desc"),
            )
            .append_pair("limit", &self.limit.unwrap_or(20).to_string());
        format!("/network-request-details?{}", query.finish())
    }
}

/// Suggestions shown when an `analyzeApiCalls` filter matched nothing.
pub fn generate_search_suggestions(search_term: &str) -> Vec<String> {
    let term = search_term.to_lowercase();
    let mut suggestions = vec!["🔍 **Search Strategy Suggestions:**".to_string()];

    match term.strip_suffix('s') {
        Some(singular) => suggestions.push(format!("   • Try singular form: \"{}\"", singular)),
        None => suggestions.push(format!("   • Try plural form: \"{}s\"", term)),
    }

    let chars: Vec<char> = term.chars().collect();
    let keep = chars.len().saturating_sub(2).max(3).min(chars.len());
    let partial: String = chars[..keep].iter().collect();
    suggestions.push(format!("   • Try partial match: \"{}\"", partial));

    suggestions.extend(
        [
            "",
            "💡 **Common API Patterns:**",
            "   • \"api\" - Find all API calls",
            "   • \"get-\" - Find getter endpoints",
            "   • \"list\" - Find list/collection endpoints",
            "   • \"auth\" - Find authentication calls",
            "   • you can use tags for filtering api's",
        ]
        .map(String::from),
    );
    suggestions
}

pub struct AnalyzeApiCallsTool {
    definition: ToolDefinition,
    adapter: Arc<RelayAdapter>,
}

impl AnalyzeApiCallsTool {
    pub fn new(adapter: Arc<RelayAdapter>) -> Self {
        let definition = ToolDefinition::new(
            "analyzeApiCalls",
            "Analyze network requests made by the browser to debug API interactions. Use this to \
             inspect request/response details, check authentication headers, or debug network \
             errors. **Search Strategy**: Try both singular and plural forms (e.g., 'activity' \
             AND 'activities'), partial matches work better than exact matches.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "urlFilter": {
                    "type": "string",
                    "description": "Substring to filter request URLs (case-insensitive)"
                },
                "details": {
                    "type": "array",
                    "items": {"type": "string", "enum": NETWORK_DETAILS},
                    "minItems": 1,
                    "description": "Specific details to retrieve for matching requests"
                },
                "timeStart": {
                    "type": "number",
                    "description": "Only requests after this Unix timestamp (ms)"
                },
                "timeEnd": {
                    "type": "number",
                    "description": "Only requests before this Unix timestamp (ms)"
                },
                "orderBy": {"type": "string", "enum": ["timestamp", "url"], "default": "timestamp"},
                "orderDirection": {"type": "string", "enum": ["asc", "desc"], "default": "desc"},
                "limit": {"type": "number", "default": 20}
            },
            "required": ["urlFilter", "details"]
        }));
        Self {
            definition,
            adapter,
        }
    }
}

#[async_trait]
impl Tool for AnalyzeApiCallsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let params: AnalyzeApiCallsParams = parse_params(params)?;
        params.validate()?;
        let path = params.request_path();
        let url_filter = params.url_filter.as_str();
        debug!("Fetching network details from {}", path);

        Ok(self
            .adapter
            .with_connection(|relay| {
                let path = path.clone();
                async move {
                    let response = relay.get(&path).await?;
                    if !response.is_success() {
                        return Ok(ToolResult::error(format!(
                            "Failed to get network request details: Server returned {}: {}",
                            response.status.as_u16(),
                            response.error_text()
                        )));
                    }
                    let results = match response.json() {
                        Ok(results) => results,
                        Err(e) => {
                            return Ok(ToolResult::error(format!(
                                "Failed to get network request details: {}",
                                e
                            )));
                        }
                    };
                    if results.as_array().is_some_and(Vec::is_empty) {
                        return Ok(ToolResult::text(format!(
                            "No API calls found matching '{}'. Try these search strategies:\n\n{}",
                            url_filter,
                            generate_search_suggestions(url_filter).join("\n")
                        )));
                    }
                    Ok(ToolResult::text(pretty(&results)))
                }
            })
            .await)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakeScreenshotParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(default = "default_true")]
    return_image_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_name: Option<String>,
}

fn default_true() -> bool {
    true
}

pub struct TakeScreenshotTool {
    definition: ToolDefinition,
    adapter: Arc<RelayAdapter>,
}

impl TakeScreenshotTool {
    pub fn new(adapter: Arc<RelayAdapter>) -> Self {
        let definition = ToolDefinition::new(
            "takeScreenshot",
            "Take a screenshot of the current browser tab and return the image data for \
             immediate analysis. The screenshot is automatically organized by project and URL \
             structure in a centralized directory system.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Custom filename without extension; defaults to timestamp-based naming"
                },
                "returnImageData": {
                    "type": "boolean",
                    "default": true,
                    "description": "Whether to return the base64 image data for immediate analysis"
                },
                "projectName": {
                    "type": "string",
                    "description": "Project folder that overrides automatic project detection"
                }
            }
        }));
        Self {
            definition,
            adapter,
        }
    }
}

/// Summary text plus the image when the relay returned one.
fn screenshot_result(result: &Value, return_image_data: bool) -> ToolResult {
    let field = |name: &str, fallback: &'static str| {
        result
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };
    let summary = format!(
        "✅ Screenshot captured successfully!\n📁 Project: {}\n📂 Category: {}\n💾 Saved to: {}",
        field("projectDirectory", "default-project"),
        field("urlCategory", "general"),
        field("filePath", "browser extension panel"),
    );
    let mut tool_result = ToolResult::text(summary);
    if return_image_data {
        if let Some(data) = result.get("imageData").and_then(Value::as_str) {
            tool_result = tool_result.with_content(Content::image(data, "image/png"));
        }
    }
    tool_result
}

#[async_trait]
impl Tool for TakeScreenshotTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let params: TakeScreenshotParams = parse_params(params)?;
        let params = &params;

        Ok(self
            .adapter
            .with_connection(|relay| async move {
                let response = relay.post("/capture-screenshot", params).await?;
                let body = match response.json() {
                    Ok(body) => body,
                    Err(e) => {
                        return Ok(ToolResult::error(format!("Failed to take screenshot: {}", e)));
                    }
                };
                if !response.is_success() {
                    let error = body.get("error").and_then(Value::as_str).unwrap_or("Unknown error");
                    return Ok(ToolResult::error(format!("Error taking screenshot: {}", error)));
                }
                Ok(screenshot_result(&body, params.return_image_data))
            })
            .await)
    }
}

pub struct GetSelectedElementTool {
    definition: ToolDefinition,
    adapter: Arc<RelayAdapter>,
}

impl GetSelectedElementTool {
    pub fn new(adapter: Arc<RelayAdapter>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "getSelectedElement",
                "Get details about the currently selected element in the browser",
            ),
            adapter,
        }
    }
}

#[async_trait]
impl Tool for GetSelectedElementTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult, ToolError> {
        Ok(self
            .adapter
            .with_connection(|relay| async move {
                let element = relay.get_json("/selected-element").await?;
                Ok(ToolResult::text(pretty(&element)))
            })
            .await)
    }
}

/// Read-only log listing backed by one relay GET endpoint.
pub struct LogQueryTool {
    definition: ToolDefinition,
    path: &'static str,
    adapter: Arc<RelayAdapter>,
}

impl LogQueryTool {
    pub fn new(
        name: &str,
        description: &str,
        path: &'static str,
        adapter: Arc<RelayAdapter>,
    ) -> Self {
        Self {
            definition: ToolDefinition::new(name, description),
            path,
            adapter,
        }
    }

    pub fn all(adapter: Arc<RelayAdapter>) -> Vec<Self> {
        [
            ("getConsoleLogs", "Check the browser's console logs", "/console-logs"),
            ("getConsoleErrors", "Check the browser's console errors", "/console-errors"),
            ("getNetworkErrors", "Check the browser's failed network requests", "/network-errors"),
            ("getNetworkLogs", "Check the browser's successful network requests", "/network-success"),
        ]
        .into_iter()
        .map(|(name, description, path)| Self::new(name, description, path, adapter.clone()))
        .collect()
    }

    pub fn path(&self) -> &str {
        self.path
    }
}

#[async_trait]
impl Tool for LogQueryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult, ToolError> {
        let path = self.path;
        Ok(self
            .adapter
            .with_connection(|relay| async move {
                let logs = relay.get_json(path).await?;
                Ok(ToolResult::text(pretty(&logs)))
            })
            .await)
    }
}

pub struct WipeLogsTool {
    definition: ToolDefinition,
    adapter: Arc<RelayAdapter>,
}

impl WipeLogsTool {
    pub fn new(adapter: Arc<RelayAdapter>) -> Self {
        Self {
            definition: ToolDefinition::new(
                "wipeLogs",
                "Wipe all browser logs and the selected element from memory",
            ),
            adapter,
        }
    }
}

#[async_trait]
impl Tool for WipeLogsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _params: Value) -> Result<ToolResult, ToolError> {
        Ok(self
            .adapter
            .with_connection(|relay| async move {
                let response = relay.post("/wipelogs", &json!({})).await?;
                let body = response.json()?;
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| pretty(&body));
                Ok(ToolResult::text(message))
            })
            .await)
    }
}

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
