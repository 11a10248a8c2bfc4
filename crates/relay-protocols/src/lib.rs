//! # Relay Protocols
//!
//! Wire-level definitions shared by every browser-relay component.
//! Contains only data types and the error taxonomy - no I/O.
//!
//! ## Contents
//!
//! - [`ServerIdentity`] - the well-known identity answered on `/.identity`
//! - [`ServerMessage`] / [`ExtensionMessage`] - JSON frames on the extension channel
//! - [`types`] - HTTP request and response bodies for the relay endpoints
//! - [`RelayError`] - failures surfaced by discovery and correlation

pub mod error;
pub mod identity;
pub mod message;
pub mod types;

pub use error::RelayError;
pub use identity::{DEFAULT_PORT, SERVER_NAME, SERVER_SIGNATURE, SERVER_VERSION, ServerIdentity};
pub use message::{ExtensionMessage, ServerMessage};
pub use types::*;
