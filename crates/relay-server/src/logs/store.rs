//! In-memory log buffers fed by the extension.

use std::collections::VecDeque;

use parking_lot::{Mutex, RwLock};
use relay_config::LogConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::network::{NetworkQuery, timestamp_ms};

/// Runtime log settings; the extension may patch these on every post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSettings {
    pub log_limit: usize,
    pub query_limit: usize,
    pub show_request_headers: bool,
    pub show_response_headers: bool,
    pub string_size_limit: usize,
}

impl From<&LogConfig> for LogSettings {
    fn from(config: &LogConfig) -> Self {
        Self {
            log_limit: config.log_limit,
            query_limit: config.query_limit,
            show_request_headers: config.show_request_headers,
            show_response_headers: config.show_response_headers,
            string_size_limit: config.string_size_limit,
        }
    }
}

impl LogSettings {
    /// Overlay the known keys of `patch`; unknown keys and ill-typed values are ignored.
    pub fn merge(&mut self, patch: &Value) {
        let Some(patch) = patch.as_object() else {
            return;
        };
        let Ok(Value::Object(mut current)) = serde_json::to_value(&*self) else {
            return;
        };
        for (key, value) in patch {
            let Some(previous) = current.insert(key.clone(), value.clone()) else {
                current.remove(key);
                continue;
            };
            if serde_json::from_value::<LogSettings>(Value::Object(current.clone())).is_err() {
                warn!("Ignoring invalid log setting {}={}", key, value);
                current.insert(key.clone(), previous);
            }
        }
        if let Ok(merged) = serde_json::from_value(Value::Object(current)) {
            *self = merged;
        }
    }
}

/// Buffers answered by the log query endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    ConsoleLogs,
    ConsoleErrors,
    NetworkErrors,
    NetworkSuccess,
}

/// What an ingested entry turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    PageNavigated { url: Option<String>, tab_id: Option<Value> },
    ConsoleLog,
    ConsoleError,
    NetworkRequest { failed: bool },
    SelectedElement,
    Unknown(String),
}

/// Buffer sizes, for logging and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCounts {
    pub console_logs: usize,
    pub console_errors: usize,
    pub network_errors: usize,
    pub network_success: usize,
    pub network_cache: usize,
}

#[derive(Default)]
struct Buffers {
    console_logs: VecDeque<Value>,
    console_errors: VecDeque<Value>,
    network_errors: VecDeque<Value>,
    network_success: VecDeque<Value>,
    network_cache: VecDeque<Value>,
    selected_element: Option<Value>,
}

impl Buffers {
    fn get(&self, kind: LogKind) -> &VecDeque<Value> {
        match kind {
            LogKind::ConsoleLogs => &self.console_logs,
            LogKind::ConsoleErrors => &self.console_errors,
            LogKind::NetworkErrors => &self.network_errors,
            LogKind::NetworkSuccess => &self.network_success,
        }
    }
}

/// Ring buffers of console and network activity plus the selected element.
pub struct LogStore {
    settings: RwLock<LogSettings>,
    buffers: Mutex<Buffers>,
    network_cache_size: usize,
}

impl LogStore {
    pub fn new(config: &LogConfig) -> Self {
        Self {
            settings: RwLock::new(LogSettings::from(config)),
            buffers: Mutex::new(Buffers::default()),
            network_cache_size: config.network_cache_size,
        }
    }

    pub fn settings(&self) -> LogSettings {
        self.settings.read().clone()
    }

    pub fn update_settings(&self, patch: &Value) {
        self.settings.write().merge(patch);
        debug!("Log settings now {:?}", self.settings.read());
    }

    /// Route one extension log entry by its `type`.
    pub fn ingest(&self, data: Value) -> Ingested {
        let log_limit = self.settings.read().log_limit;
        let kind = data
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut buffers = self.buffers.lock();
        match kind.as_str() {
            "page-navigated" => Ingested::PageNavigated {
                url: data.get("url").and_then(Value::as_str).map(str::to_string),
                tab_id: data.get("tabId").filter(|v| !v.is_null()).cloned(),
            },
            "console-log" => {
                push_capped(&mut buffers.console_logs, data, log_limit);
                Ingested::ConsoleLog
            }
            "console-error" => {
                push_capped(&mut buffers.console_errors, data, log_limit);
                Ingested::ConsoleError
            }
            "network-request" => {
                let failed = data
                    .get("status")
                    .and_then(Value::as_f64)
                    .is_some_and(|status| status >= 400.0);
                push_capped(&mut buffers.network_cache, data.clone(), self.network_cache_size);
                if failed {
                    push_capped(&mut buffers.network_errors, data, log_limit);
                } else {
                    push_capped(&mut buffers.network_success, data, log_limit);
                }
                Ingested::NetworkRequest { failed }
            }
            "selected-element" => {
                buffers.selected_element = data.get("element").cloned();
                Ingested::SelectedElement
            }
            _ => {
                debug!("Unknown log type: {}", kind);
                Ingested::Unknown(kind)
            }
        }
    }

    /// Entries of `kind`, oldest first, cut to the query limit.
    pub fn query(&self, kind: LogKind) -> Vec<Value> {
        let entries: Vec<Value> = self.buffers.lock().get(kind).iter().cloned().collect();
        self.limit_to_query(entries)
    }

    /// Success and error network entries merged by timestamp.
    pub fn all_xhr(&self) -> Vec<Value> {
        let mut merged: Vec<Value> = {
            let buffers = self.buffers.lock();
            buffers
                .network_success
                .iter()
                .chain(buffers.network_errors.iter())
                .cloned()
                .collect()
        };
        merged.sort_by_key(timestamp_ms);
        self.limit_to_query(merged)
    }

    pub fn selected_element(&self) -> Option<Value> {
        self.buffers.lock().selected_element.clone()
    }

    pub fn set_selected_element(&self, element: Option<Value>) {
        self.buffers.lock().selected_element = element;
    }

    /// Project the detailed network cache through `query`.
    pub fn network_details(&self, query: &NetworkQuery) -> Vec<Value> {
        let buffers = self.buffers.lock();
        query.apply(buffers.network_cache.iter())
    }

    /// Clear every buffer and the selection.
    pub fn wipe(&self) {
        *self.buffers.lock() = Buffers::default();
        debug!("All logs wiped");
    }

    pub fn counts(&self) -> LogCounts {
        let buffers = self.buffers.lock();
        LogCounts {
            console_logs: buffers.console_logs.len(),
            console_errors: buffers.console_errors.len(),
            network_errors: buffers.network_errors.len(),
            network_success: buffers.network_success.len(),
            network_cache: buffers.network_cache.len(),
        }
    }

    fn limit_to_query(&self, entries: Vec<Value>) -> Vec<Value> {
        let settings = self.settings();
        let mut total = 0;
        let mut result = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = present(entry, &settings);
            let size = serde_json::to_string(&entry).map(|s| s.len()).unwrap_or(0);
            if total + size > settings.query_limit {
                debug!(
                    "Reached query limit ({}/{}), truncating logs",
                    total, settings.query_limit
                );
                break;
            }
            total += size;
            result.push(entry);
        }
        result
    }
}

fn push_capped(buffer: &mut VecDeque<Value>, entry: Value, limit: usize) {
    buffer.push_back(entry);
    while buffer.len() > limit {
        buffer.pop_front();
    }
}

/// Strip hidden headers and shorten long strings for output.
fn present(mut entry: Value, settings: &LogSettings) -> Value {
    if let Value::Object(map) = &mut entry {
        if map.get("type").and_then(Value::as_str) == Some("network-request") {
            if !settings.show_request_headers {
                map.remove("requestHeaders");
            }
            if !settings.show_response_headers {
                map.remove("responseHeaders");
            }
        }
    }
    truncate_strings(entry, settings.string_size_limit)
}

fn truncate_strings(value: Value, max_len: usize) -> Value {
    match value {
        Value::String(s) if s.chars().count() > max_len => {
            let mut cut: String = s.chars().take(max_len).collect();
            cut.push_str("... (truncated)");
            Value::String(cut)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| truncate_strings(v, max_len))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, truncate_strings(v, max_len)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
