//! `searchApiDocs`: filter an OpenAPI 3 or Swagger 2 document in memory.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use regex::RegexBuilder;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::{Tool, parse_params, pretty};
use crate::error::ToolError;
use crate::protocol::{Content, ToolDefinition, ToolResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Keyword table for suggestions when nothing matched.
const COMMON_PATTERNS: &[(&str, &[&str])] = &[
    ("get", &["GET /{resource}", "GET /{resource}/{id}", "GET /{resource}/list"]),
    ("post", &["POST /{resource}", "POST /{resource}/create"]),
    ("put", &["PUT /{resource}/{id}", "PUT /{resource}/update"]),
    ("patch", &["PATCH /{resource}/{id}"]),
    ("delete", &["DELETE /{resource}/{id}"]),
    ("user", &["/api/users", "/users/{id}", "/auth/users", "/user/profile"]),
    ("auth", &["/auth/login", "/auth/logout", "/auth/register", "/auth/token", "/oauth/token"]),
    ("login", &["/auth/login", "/login", "/api/auth/login"]),
    ("token", &["/auth/token", "/oauth/token", "/api/token/refresh"]),
    ("profile", &["/user/profile", "/api/profile", "/users/me"]),
    ("list", &["/api/{resource}/list", "/{resource}", "/api/{resource}"]),
    ("search", &["/api/search", "/{resource}/search", "/search/{resource}"]),
    ("filter", &["/{resource}?filter=", "/api/{resource}/filter"]),
    ("page", &["/{resource}?page=", "/{resource}?offset=", "/{resource}?limit="]),
    ("upload", &["/api/files/upload", "/upload", "/media/upload"]),
    ("download", &["/api/files/download", "/download/{id}", "/media/{id}"]),
    ("file", &["/api/files", "/files/{id}", "/media/files"]),
    ("order", &["/api/orders", "/orders/{id}", "/orders/create"]),
    ("payment", &["/api/payments", "/payments/process", "/billing/payments"]),
    ("product", &["/api/products", "/products/{id}", "/catalog/products"]),
    ("category", &["/api/categories", "/categories/{id}", "/products/categories"]),
    ("admin", &["/admin/api", "/api/admin", "/admin/{resource}"]),
    ("config", &["/api/config", "/admin/config", "/settings/config"]),
    ("setting", &["/api/settings", "/user/settings", "/admin/settings"]),
    ("analytics", &["/api/analytics", "/analytics/events", "/analytics/reports"]),
    ("report", &["/api/reports", "/reports/{type}", "/analytics/reports"]),
    ("metric", &["/api/metrics", "/analytics/metrics", "/monitoring/metrics"]),
    ("health", &["/health", "/api/health", "/status/health"]),
    ("status", &["/status", "/api/status", "/health/status"]),
    ("ping", &["/ping", "/api/ping", "/health/ping"]),
];

const GENERIC_PATTERNS: [&str; 5] = [
    "/api/v1/{resource}",
    "/api/v2/{resource}",
    "/{resource}",
    "/rest/{resource}",
    "/graphql",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub api_pattern: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub include_auth: bool,
    #[serde(default)]
    pub has_parameters: bool,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            api_pattern: None,
            tag: None,
            method: None,
            include_auth: false,
            has_parameters: false,
            max_results: default_max_results(),
        }
    }
}

fn default_max_results() -> usize {
    20
}

impl SearchFilters {
    /// Filters echoed back when nothing matched.
    fn summary(&self) -> Value {
        let mut summary = Map::new();
        for (key, value) in [
            ("apiPattern", &self.api_pattern),
            ("tag", &self.tag),
            ("method", &self.method),
        ] {
            if let Some(value) = value {
                summary.insert(key.to_string(), json!(value));
            }
        }
        summary.insert("includeAuth".to_string(), json!(self.include_auth));
        summary.insert("hasParameters".to_string(), json!(self.has_parameters));
        Value::Object(summary)
    }
}

fn non_empty_array(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_array)
        .is_some_and(|items| !items.is_empty())
}

fn text_of(value: Option<&Value>) -> &str {
    value.and_then(Value::as_str).unwrap_or_default()
}

fn or_default(value: Option<&Value>, default: Value) -> Value {
    value.filter(|v| !v.is_null()).cloned().unwrap_or(default)
}

/// Endpoints of `doc` matching every filter, in document order, at most
/// `max_results` of them.
pub fn find_matching_endpoints(
    doc: &Value,
    filters: &SearchFilters,
) -> Result<Vec<Value>, regex::Error> {
    let regex = filters
        .api_pattern
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
        .transpose()?;
    let tag = filters.tag.as_deref().map(str::to_lowercase);
    let is_swagger2 = doc
        .get("swagger")
        .and_then(Value::as_str)
        .is_some_and(|v| v.starts_with("2."));

    let mut matches = Vec::new();
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Ok(matches);
    };

    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        for (http_method, op) in item {
            if matches.len() >= filters.max_results {
                return Ok(matches);
            }
            if !HTTP_METHODS.contains(&http_method.as_str()) {
                continue;
            }
            let operation_id = op
                .get("operationId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} {}", http_method, path));
            let summary = text_of(op.get("summary"));
            let description = text_of(op.get("description"));
            let has_auth = non_empty_array(op.get("security"));
            let has_params = non_empty_array(op.get("parameters"))
                || op.get("requestBody").is_some_and(|b| !b.is_null())
                || path.contains('{');

            if let Some(regex) = &regex {
                let hit = regex.is_match(path)
                    || regex.is_match(&operation_id)
                    || (!summary.is_empty() && regex.is_match(summary))
                    || (!description.is_empty() && regex.is_match(description));
                if !hit {
                    continue;
                }
            }
            if let Some(tag) = &tag {
                let tagged = op
                    .get("tags")
                    .and_then(Value::as_array)
                    .is_some_and(|tags| {
                        tags.iter()
                            .filter_map(Value::as_str)
                            .any(|t| t.to_lowercase().contains(tag.as_str()))
                    });
                if !tagged {
                    continue;
                }
            }
            if let Some(method) = &filters.method {
                if !http_method.eq_ignore_ascii_case(method) {
                    continue;
                }
            }
            if filters.include_auth && !has_auth {
                continue;
            }
            if filters.has_parameters && !has_params {
                continue;
            }

            let parameters = or_default(op.get("parameters"), json!([]));
            let responses = or_default(op.get("responses"), json!({}));
            let mut endpoint = json!({
                "path": path,
                "method": http_method.to_uppercase(),
                "operationId": operation_id,
                "summary": summary,
                "description": description,
                "tags": or_default(op.get("tags"), json!([])),
                "parameterCount": parameters.as_array().map_or(0, Vec::len),
                "responseCount": responses.as_object().map_or(0, Map::len),
                "parameters": parameters,
                "requestBody": or_default(op.get("requestBody"), Value::Null),
                "responses": responses,
                "security": or_default(op.get("security"), json!([])),
                "servers": or_default(op.get("servers").or(doc.get("servers")), json!([])),
                "hasAuth": has_auth,
                "hasParams": has_params,
            });
            if is_swagger2 {
                if let Some(fields) = endpoint.as_object_mut() {
                    for key in ["consumes", "produces", "schemes"] {
                        fields.insert(
                            key.to_string(),
                            or_default(op.get(key).or(doc.get(key)), json!([])),
                        );
                    }
                    fields.insert("host".to_string(), or_default(doc.get("host"), Value::Null));
                    fields.insert(
                        "basePath".to_string(),
                        or_default(doc.get("basePath"), json!("")),
                    );
                }
            }
            matches.push(endpoint);
        }
        if matches.len() >= filters.max_results {
            break;
        }
    }
    Ok(matches)
}

/// Name of a local `$ref` target (`#/components/schemas/User` -> `User`).
fn ref_name(schema: Option<&Value>) -> Option<&str> {
    schema?.get("$ref")?.as_str()?.rsplit('/').next()
}

/// Attach every directly referenced schema to each endpoint as `schemas`.
pub fn attach_schemas(doc: &Value, endpoints: &mut [Value]) {
    let empty = Map::new();
    let schemas = doc
        .pointer("/components/schemas")
        .or_else(|| doc.get("definitions"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    for endpoint in endpoints.iter_mut() {
        let mut names: Vec<String> = Vec::new();
        let mut collect = |name: Option<&str>| {
            if let Some(name) = name {
                names.push(name.to_string());
            }
        };

        if let Some(params) = endpoint.get("parameters").and_then(Value::as_array) {
            for param in params {
                collect(ref_name(param.get("schema")));
            }
        }
        if let Some(content) = endpoint
            .pointer("/requestBody/content")
            .and_then(Value::as_object)
        {
            for media in content.values() {
                collect(ref_name(media.get("schema")));
            }
        }
        if let Some(responses) = endpoint.get("responses").and_then(Value::as_object) {
            for response in responses.values() {
                match response.get("content").and_then(Value::as_object) {
                    Some(content) => {
                        for media in content.values() {
                            collect(ref_name(media.get("schema")));
                        }
                    }
                    None => collect(ref_name(response.get("schema"))),
                }
            }
        }

        let resolved: Map<String, Value> = names
            .into_iter()
            .filter_map(|name| schemas.get(&name).map(|s| (name, s.clone())))
            .collect();
        if let Some(fields) = endpoint.as_object_mut() {
            fields.insert("schemas".to_string(), Value::Object(resolved));
        }
    }
}

/// Likely endpoint shapes for a search term that matched nothing.
pub fn generate_api_suggestions(api_pattern: &str, doc: &Value) -> Vec<String> {
    let pattern = api_pattern.to_lowercase();
    let mut suggestions: Vec<String> = COMMON_PATTERNS
        .iter()
        .filter(|(keyword, _)| pattern.contains(keyword) || keyword.contains(pattern.as_str()))
        .flat_map(|(_, hints)| hints.iter().map(|h| h.to_string()))
        .collect();

    if suggestions.is_empty() {
        let guess: String = pattern
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();
        if !guess.is_empty() {
            suggestions.extend([
                format!("/api/{guess}"),
                format!("/api/{guess}/{{id}}"),
                format!("/{guess}"),
                format!("/{guess}/list"),
                format!("/api/{guess}/create"),
                format!("/api/{guess}/search"),
            ]);
        }
        suggestions.extend(GENERIC_PATTERNS.map(String::from));
    }

    if let Some(paths) = doc.get("paths").and_then(Value::as_object) {
        let words: Vec<&str> = pattern
            .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
            .filter(|w| w.len() > 2)
            .collect();
        let similar: Vec<&String> = paths
            .keys()
            .filter(|path| {
                let lower = path.to_lowercase();
                words.iter().any(|w| lower.contains(w))
            })
            .take(10)
            .collect();
        if !similar.is_empty() {
            suggestions.push("Similar paths found in your API:".to_string());
            suggestions.extend(similar.into_iter().cloned());
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in paths
            .keys()
            .flat_map(|p| p.split('/'))
            .filter(|s| !s.is_empty() && !s.starts_with('{'))
        {
            if !segments.contains(&segment) {
                segments.push(segment);
            }
        }
        let related: Vec<&str> = segments
            .into_iter()
            .filter(|s| {
                let lower = s.to_lowercase();
                lower.contains(&pattern) || pattern.contains(&lower)
            })
            .take(8)
            .collect();
        if !related.is_empty() {
            suggestions.push("Related API segments in your documentation:".to_string());
            for segment in related {
                suggestions.push(format!("/api/{segment}"));
                suggestions.push(format!("/{segment}"));
            }
        }
    }

    let mut unique: Vec<String> = Vec::new();
    for suggestion in suggestions {
        if !suggestion.trim().is_empty() && !unique.contains(&suggestion) {
            unique.push(suggestion);
        }
    }
    unique
}

/// Fetch a document over http(s), parse an inline JSON document, or read a file.
pub async fn load_swagger_doc(client: &Client, source: &str) -> Result<Value, String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = client.get(source).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "Failed to fetch Swagger doc: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            ));
        }
        return response.json().await.map_err(|e| e.to_string());
    }
    if let Ok(doc) = serde_json::from_str(source) {
        return Ok(doc);
    }
    let content = tokio::fs::read_to_string(Path::new(source))
        .await
        .map_err(|e| format!("{}: {}", source, e))?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(flatten)]
    filters: SearchFilters,
    #[serde(default = "default_include_schemas")]
    include_schemas: bool,
}

fn default_include_schemas() -> bool {
    true
}

pub struct SearchApiDocsTool {
    definition: ToolDefinition,
    swagger_url: Option<String>,
    client: Client,
}

impl SearchApiDocsTool {
    pub fn new(swagger_url: Option<String>) -> Self {
        let definition = ToolDefinition::new(
            "searchApiDocs",
            "Search API documentation to find endpoints, parameters, and response schemas. \
             **Workflow**: Use searchApiDocs first to find correct endpoint names, then \
             analyzeApiCalls to see actual network requests, then executeAuthenticatedApiCall \
             to test with real data.",
        )
        .with_input_schema(json!({
            "type": "object",
            "properties": {
                "apiPattern": {
                    "type": "string",
                    "description": "Regex matched case-insensitively against paths, operationIds, summaries and descriptions"
                },
                "tag": {"type": "string", "description": "Filter by OpenAPI tag"},
                "method": {"type": "string", "description": "Filter by HTTP method"},
                "includeSchemas": {"type": "boolean", "default": true},
                "includeAuth": {
                    "type": "boolean",
                    "default": false,
                    "description": "Only endpoints that require authentication"
                },
                "hasParameters": {
                    "type": "boolean",
                    "default": false,
                    "description": "Only endpoints with query, path or body parameters"
                },
                "maxResults": {"type": "number", "default": 20}
            }
        }));
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            definition,
            swagger_url,
            client,
        }
    }

    async fn search(&self, params: SearchParams) -> Result<ToolResult, String> {
        let source = self
            .swagger_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or("SWAGGER_URL environment variable is not set")?;
        debug!("Searching API docs with filters {}", params.filters.summary());

        let doc = load_swagger_doc(&self.client, source).await?;
        let mut endpoints =
            find_matching_endpoints(&doc, &params.filters).map_err(|e| e.to_string())?;

        if endpoints.is_empty() {
            let filters = &params.filters;
            let term = filters
                .api_pattern
                .as_deref()
                .or(filters.tag.as_deref())
                .or(filters.method.as_deref())
                .filter(|t| !t.is_empty())
                .unwrap_or("api");
            let suggestions = generate_api_suggestions(term, &doc);
            return Ok(ToolResult::text(format!(
                "No API endpoints found matching filters: {}",
                filters.summary()
            ))
            .with_content(Content::text(format!(
                "\n--- Suggested API Patterns ---\n{}",
                suggestions.join("\n")
            ))));
        }

        if params.include_schemas {
            attach_schemas(&doc, &mut endpoints);
        }
        Ok(ToolResult::text(pretty(&Value::Array(endpoints))))
    }
}

#[async_trait]
impl Tool for SearchApiDocsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, params: Value) -> Result<ToolResult, ToolError> {
        let params: SearchParams = parse_params(params)?;
        Ok(self.search(params).await.unwrap_or_else(|e| {
            warn!("searchApiDocs failed: {}", e);
            ToolResult::error(format!("Failed to search API documentation: {}", e))
        }))
    }
}

#[cfg(test)]
#[path = "api_docs_tests.rs"]
mod tests;
