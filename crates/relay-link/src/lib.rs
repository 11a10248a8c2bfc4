//! # Relay Link
//!
//! The browser extension's end of the relay channel, usable from Rust:
//! identity check, WebSocket attach, automatic heartbeat answers and a
//! bounded exponential reconnection policy.

pub mod error;
pub mod link;
pub mod reconnect;

pub use error::LinkError;
pub use link::{ExtensionLink, LinkEvent, LinkOptions};
pub use reconnect::{LinkState, ReconnectPolicy, Reconnector};
