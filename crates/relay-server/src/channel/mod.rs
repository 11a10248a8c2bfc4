//! Extension channel: the single WebSocket link to the browser extension,
//! request/reply correlation over it, and heartbeat liveness.

mod bridge;
mod correlator;
mod heartbeat;
mod registry;

pub use bridge::{ExtensionBridge, PageInfo, RelayRequest};
pub use correlator::{Correlator, PendingReply, ReplyKind, Resolution};
pub use heartbeat::HeartbeatTick;
pub use registry::{
    CLOSE_GOING_AWAY, CLOSE_NORMAL, ConnectionRegistry, ConnectionSnapshot, Outbound,
};
