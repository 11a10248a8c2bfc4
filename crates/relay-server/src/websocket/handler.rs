//! Extension WebSocket handler.
//!
//! Each socket gets a writer task draining the connection's outbound queue,
//! while this task reads frames and hands them to the bridge.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::channel::{ExtensionBridge, Outbound};
use crate::state::RelayState;

/// WebSocket upgrade handler for the extension.
pub async fn extension_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    let bridge = state.bridge.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, bridge))
}

async fn handle_socket(socket: WebSocket, bridge: Arc<ExtensionBridge>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(bridge.config().outbound_buffer);
    let connection_id = bridge.attach(tx);

    let writer_id = connection_id.clone();
    let mut sender_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Message(message) => {
                    let json = match serde_json::to_string(&message) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to encode message for {}: {}", writer_id, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close { code, reason } => {
                    debug!("Closing {} with {} ({})", writer_id, code, reason);
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            // The writer stops after a close frame or a dead socket.
            _ = &mut sender_task => break,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => bridge.handle_frame(&connection_id, text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(frame) => info!(
                            "Extension closed {} - code: {}, reason: {}",
                            connection_id, frame.code, frame.reason
                        ),
                        None => info!("Extension closed {}", connection_id),
                    }
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
                None => break,
            }
        }
    }

    sender_task.abort();
    bridge.detach(&connection_id);
    info!("WebSocket disconnected: {}", connection_id);
}
