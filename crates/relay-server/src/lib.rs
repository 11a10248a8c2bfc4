//! # Relay Server
//!
//! Local HTTP + WebSocket relay between tool clients and the browser
//! extension.
//!
//! ## Architecture
//!
//! ```text
//! Tool adapter ──HTTP──> routes ──> ExtensionBridge ──WS──> extension
//!                           │          ├─ ConnectionRegistry (single slot)
//!                           │          ├─ Correlator (requestId -> reply)
//!                           │          └─ heartbeat monitor
//!                           ├──> LogStore (ring buffers)
//!                           └──> ScreenshotStore (filing)
//! ```

pub mod api_call;
pub mod channel;
pub mod error;
pub mod http;
pub mod logs;
pub mod screenshot;
pub mod server;
pub mod state;
pub mod websocket;

pub use channel::{ExtensionBridge, PageInfo, RelayRequest};
pub use error::{ApiError, FilingError, ServerError};
pub use http::routes::create_router;
pub use logs::LogStore;
pub use screenshot::{FileScreenshotStore, ScreenshotStore};
pub use server::RelayServer;
pub use state::RelayState;
