//! # Relay MCP
//!
//! MCP server exposing browser tools to AI assistants. Relay-backed tools
//! locate the browser relay by probing its identity endpoint and retry once
//! after rediscovery when a call fails at the transport level.

pub mod adapter;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use adapter::{RelayAdapter, RelayClient, RelayResponse};
pub use discovery::{DiscoveredEndpoint, DiscoveryPlan, HttpIdentityProbe, IdentityProbe, discover};
pub use error::{AdapterError, ToolError};
pub use protocol::{Content, RpcError, RpcRequest, RpcResponse, ToolDefinition, ToolResult};
pub use server::McpServer;
pub use tools::{Tool, ToolRegistry, default_registry};
