//! Queries over the detailed network cache.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Field of a cached network entry that a query may project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkDetail {
    Url,
    Method,
    Status,
    Timestamp,
    RequestHeaders,
    ResponseHeaders,
    RequestBody,
    ResponseBody,
}

impl NetworkDetail {
    pub const ALL: [NetworkDetail; 8] = [
        Self::Url,
        Self::Method,
        Self::Status,
        Self::Timestamp,
        Self::RequestHeaders,
        Self::ResponseHeaders,
        Self::RequestBody,
        Self::ResponseBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Method => "method",
            Self::Status => "status",
            Self::Timestamp => "timestamp",
            Self::RequestHeaders => "requestHeaders",
            Self::ResponseHeaders => "responseHeaders",
            Self::RequestBody => "requestBody",
            Self::ResponseBody => "responseBody",
        }
    }
}

impl fmt::Display for NetworkDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkDetail {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|d| d.as_str() == s).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    Timestamp,
    Url,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

/// Raw `GET /network-request-details` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkQueryParams {
    pub url_filter: Option<String>,
    pub details: Option<String>,
    pub time_start: Option<i64>,
    pub time_end: Option<i64>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
    pub limit: Option<usize>,
    pub include_timestamp: Option<bool>,
}

/// A validated network query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkQuery {
    pub url_filter: String,
    pub details: Vec<NetworkDetail>,
    pub time_start: Option<i64>,
    pub time_end: Option<i64>,
    pub order_by: OrderBy,
    pub order_direction: OrderDirection,
    pub limit: usize,
    pub include_timestamp: bool,
}

pub const DEFAULT_DETAILS_LIMIT: usize = 20;

impl NetworkQueryParams {
    pub fn parse(self) -> Result<NetworkQuery, String> {
        let (Some(url_filter), Some(details)) = (
            self.url_filter.filter(|f| !f.is_empty()),
            self.details.filter(|d| !d.is_empty()),
        ) else {
            return Err("Missing urlFilter or details query parameters".to_string());
        };

        let mut parsed = Vec::new();
        let mut invalid = Vec::new();
        for name in details.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match name.parse::<NetworkDetail>() {
                Ok(detail) => parsed.push(detail),
                Err(()) => invalid.push(name),
            }
        }
        if !invalid.is_empty() {
            return Err(format!("Invalid details requested: {}", invalid.join(", ")));
        }

        let order_by = match self.order_by.as_deref() {
            None | Some("timestamp") => OrderBy::Timestamp,
            Some("url") => OrderBy::Url,
            Some(other) => return Err(format!("Invalid orderBy: {}", other)),
        };
        let order_direction = match self.order_direction.as_deref() {
            None | Some("desc") => OrderDirection::Desc,
            Some("asc") => OrderDirection::Asc,
            Some(other) => return Err(format!("Invalid orderDirection: {}", other)),
        };

        Ok(NetworkQuery {
            url_filter,
            details: parsed,
            time_start: self.time_start,
            time_end: self.time_end,
            order_by,
            order_direction,
            limit: self.limit.unwrap_or(DEFAULT_DETAILS_LIMIT),
            include_timestamp: self.include_timestamp.unwrap_or(false),
        })
    }
}

impl NetworkQuery {
    /// Filter, order, cap and project `entries`.
    pub fn apply<'a>(&self, entries: impl Iterator<Item = &'a Value>) -> Vec<Value> {
        let needle = self.url_filter.to_lowercase();
        let mut matched: Vec<&Value> = entries
            .filter(|entry| {
                entry
                    .get("url")
                    .and_then(Value::as_str)
                    .is_some_and(|url| url.to_lowercase().contains(&needle))
            })
            .filter(|entry| {
                let ts = timestamp_ms(entry);
                self.time_start.is_none_or(|start| ts >= start)
                    && self.time_end.is_none_or(|end| ts <= end)
            })
            .collect();

        matched.sort_by(|a, b| {
            let ordering = match self.order_by {
                OrderBy::Timestamp => timestamp_ms(a).cmp(&timestamp_ms(b)),
                OrderBy::Url => url_of(a).cmp(url_of(b)),
            };
            match self.order_direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            }
        });

        matched
            .into_iter()
            .take(self.limit)
            .map(|entry| self.project(entry))
            .collect()
    }

    fn project(&self, entry: &Value) -> Value {
        let mut out = Map::new();
        let wanted = self
            .details
            .iter()
            .map(NetworkDetail::as_str)
            .chain(self.include_timestamp.then_some("timestamp"));
        for key in wanted {
            if let Some(value) = entry.get(key) {
                out.insert(key.to_string(), value.clone());
            }
        }
        Value::Object(out)
    }
}

fn url_of(entry: &Value) -> &str {
    entry.get("url").and_then(Value::as_str).unwrap_or_default()
}

/// Milliseconds since the epoch of an entry's `timestamp`, which the extension
/// sends either as a number or as an RFC 3339 string. Missing sorts first.
pub(crate) fn timestamp_ms(entry: &Value) -> i64 {
    match entry.get("timestamp") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|t| t.timestamp_millis())
            .unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(url_filter: &str, details: &str) -> NetworkQueryParams {
        NetworkQueryParams {
            url_filter: Some(url_filter.to_string()),
            details: Some(details.to_string()),
            ..Default::default()
        }
    }

    fn cache() -> Vec<Value> {
        vec![
            json!({"url": "http://localhost/api/users", "method": "GET", "status": 200, "timestamp": 1000, "responseBody": "[]"}),
            json!({"url": "http://localhost/api/Users/7", "method": "PUT", "status": 500, "timestamp": 3000}),
            json!({"url": "http://localhost/static/app.js", "method": "GET", "status": 200, "timestamp": 2000}),
        ]
    }

    #[test]
    fn test_parse_requires_filter_and_details() {
        let err = NetworkQueryParams::default().parse().unwrap_err();
        assert_eq!(err, "Missing urlFilter or details query parameters");

        let err = params("users", "").parse().unwrap_err();
        assert_eq!(err, "Missing urlFilter or details query parameters");
    }

    #[test]
    fn test_parse_lists_invalid_details() {
        let err = params("users", "url,cookies,headers").parse().unwrap_err();
        assert_eq!(err, "Invalid details requested: cookies, headers");
    }

    #[test]
    fn test_timestamp_is_a_valid_detail() {
        let query = params("users", "url,timestamp").parse().unwrap();
        assert_eq!(query.details, vec![NetworkDetail::Url, NetworkDetail::Timestamp]);
        assert_eq!(query.limit, DEFAULT_DETAILS_LIMIT);
        assert_eq!(query.order_direction, OrderDirection::Desc);
    }

    #[test]
    fn test_apply_filters_case_insensitively_newest_first() {
        let query = params("USERS", "url,status").parse().unwrap();
        let entries = cache();
        let result = query.apply(entries.iter());

        assert_eq!(
            result,
            vec![
                json!({"url": "http://localhost/api/Users/7", "status": 500}),
                json!({"url": "http://localhost/api/users", "status": 200}),
            ]
        );
    }

    #[test]
    fn test_apply_time_window_and_limit() {
        let mut raw = params("localhost", "method");
        raw.time_start = Some(1500);
        raw.order_direction = Some("asc".to_string());
        raw.limit = Some(1);
        raw.include_timestamp = Some(true);
        let query = raw.parse().unwrap();

        let entries = cache();
        let result = query.apply(entries.iter());
        assert_eq!(result, vec![json!({"method": "GET", "timestamp": 2000})]);
    }

    #[test]
    fn test_missing_fields_are_not_projected() {
        let query = params("app.js", "url,responseBody").parse().unwrap();
        let entries = cache();
        let result = query.apply(entries.iter());
        assert_eq!(result, vec![json!({"url": "http://localhost/static/app.js"})]);
    }

    #[test]
    fn test_timestamp_ms_accepts_strings() {
        assert_eq!(timestamp_ms(&json!({"timestamp": 42})), 42);
        assert_eq!(
            timestamp_ms(&json!({"timestamp": "1970-01-01T00:00:01.500Z"})),
            1500
        );
        assert_eq!(timestamp_ms(&json!({})), 0);
    }
}
