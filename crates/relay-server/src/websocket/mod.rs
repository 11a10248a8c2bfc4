//! `/extension-ws`: the browser extension's side of the channel.

mod handler;

pub use handler::extension_ws_handler;
