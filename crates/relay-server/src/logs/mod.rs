//! Console and network logs posted by the extension.

mod network;
mod store;

pub use network::{
    DEFAULT_DETAILS_LIMIT, NetworkDetail, NetworkQuery, NetworkQueryParams, OrderBy,
    OrderDirection,
};
pub use store::{Ingested, LogCounts, LogKind, LogSettings, LogStore};
