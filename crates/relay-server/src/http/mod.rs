//! HTTP interface module.
//!
//! - Identity and health (`/.identity`, `/.port`, `/connection-health`)
//! - Relay endpoints that round-trip through the extension channel
//! - Log ingestion and query surface

pub mod routes;

pub(crate) mod identity;
pub(crate) mod logs;
pub(crate) mod relay;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Decode a JSON body, treating an empty body as `T::default()`.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}
