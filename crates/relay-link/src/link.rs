//! Extension WebSocket link.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use relay_protocols::{ExtensionMessage, ServerIdentity, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::error::LinkError;
use crate::reconnect::Reconnector;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(Debug, Clone)]
pub struct LinkOptions {
    /// Answer `heartbeat` with `heartbeat-response` instead of surfacing it.
    pub answer_heartbeats: bool,
    pub identity_timeout: Duration,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            answer_heartbeats: true,
            identity_timeout: Duration::from_secs(3),
        }
    }
}

/// What the relay sent us.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Message(ServerMessage),
    /// The channel ended; `code` is absent when no close frame arrived.
    Closed { code: Option<u16>, reason: String },
}

/// A connected extension channel.
pub struct ExtensionLink {
    base_url: String,
    writer: Arc<Mutex<WsSink>>,
    events: mpsc::UnboundedReceiver<LinkEvent>,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl ExtensionLink {
    /// Verify the relay at `base_url` (e.g. `http://127.0.0.1:3025`) and attach.
    pub async fn connect(base_url: &str) -> Result<Self, LinkError> {
        Self::connect_with(base_url, LinkOptions::default()).await
    }

    pub async fn connect_with(base_url: &str, options: LinkOptions) -> Result<Self, LinkError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        check_identity(&base_url, options.identity_timeout).await?;

        let ws_url = ws_url(&base_url);
        let (stream, _) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
        let (sink, source) = stream.split();
        let writer = Arc::new(Mutex::new(sink));
        let (events_tx, events) = mpsc::unbounded_channel();

        let recv_task = {
            let writer = writer.clone();
            tokio::spawn(async move {
                receive_loop(source, writer, events_tx, options.answer_heartbeats).await;
            })
        };

        info!("Extension link connected to {}", ws_url);
        Ok(Self {
            base_url,
            writer,
            events,
            _recv_task: recv_task,
        })
    }

    /// Connect, backing off between failures as `reconnector` dictates.
    pub async fn connect_with_retry(
        base_url: &str,
        options: LinkOptions,
        reconnector: &mut Reconnector,
    ) -> Result<Self, LinkError> {
        loop {
            reconnector.connecting();
            match Self::connect_with(base_url, options.clone()).await {
                Ok(link) => {
                    reconnector.connected();
                    return Ok(link);
                }
                Err(e) => match reconnector.failed() {
                    Some(delay) => {
                        warn!("Connecting to {} failed: {}; retrying in {:?}", base_url, e, delay);
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        return Err(LinkError::ReconnectExhausted {
                            attempts: reconnector.policy().max_attempts,
                            last: e.to_string(),
                        });
                    }
                },
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send(&self, message: &ExtensionMessage) -> Result<(), LinkError> {
        let json = serde_json::to_string(message)?;
        trace!("Link send: {}", json);
        self.writer.lock().await.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Next event, or `None` once the channel has been fully drained.
    pub async fn next_event(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }

    /// Next relay message; `None` once the channel closed.
    pub async fn next_message(&mut self) -> Option<ServerMessage> {
        match self.events.recv().await? {
            LinkEvent::Message(message) => Some(message),
            LinkEvent::Closed { .. } => None,
        }
    }

    /// Close the channel from the extension side.
    pub async fn close(&self, reason: &str) -> Result<(), LinkError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        };
        self.writer
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await?;
        Ok(())
    }
}

async fn check_identity(base_url: &str, timeout: Duration) -> Result<(), LinkError> {
    let url = format!("{}/.identity", base_url);
    let failed = |reason: String| LinkError::Identity {
        url: url.clone(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| failed(e.to_string()))?;
    let identity: ServerIdentity = client
        .get(&url)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?
        .json()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !identity.is_relay() {
        return Err(LinkError::NotRelay(base_url.to_string()));
    }
    debug!("Relay identity confirmed on port {}", identity.port);
    Ok(())
}

async fn receive_loop(
    mut source: WsSource,
    writer: Arc<Mutex<WsSink>>,
    events: mpsc::UnboundedSender<LinkEvent>,
    answer_heartbeats: bool,
) {
    let closed = loop {
        let Some(frame) = source.next().await else {
            break LinkEvent::Closed {
                code: None,
                reason: String::new(),
            };
        };
        match frame {
            Ok(Message::Text(text)) => {
                trace!("Link recv: {}", text.as_str());
                let message = match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!("Failed to parse relay message: {}", e);
                        continue;
                    }
                };
                if let ServerMessage::Heartbeat {
                    connection_id,
                    timestamp,
                } = &message
                {
                    if answer_heartbeats {
                        let reply = ExtensionMessage::HeartbeatResponse {
                            connection_id: Some(connection_id.clone()),
                            timestamp: Some(*timestamp),
                        };
                        if let Err(e) = send_json(&writer, &reply).await {
                            warn!("Failed to answer heartbeat: {}", e);
                        }
                        continue;
                    }
                }
                if events.send(LinkEvent::Message(message)).is_err() {
                    return;
                }
            }
            Ok(Message::Close(frame)) => {
                let (code, reason) = match frame {
                    Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_string()),
                    None => (None, String::new()),
                };
                debug!("Relay closed the link: {:?} {}", code, reason);
                break LinkEvent::Closed { code, reason };
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Link WebSocket error: {}", e);
                break LinkEvent::Closed {
                    code: None,
                    reason: e.to_string(),
                };
            }
        }
    };
    let _ = events.send(closed);
}

async fn send_json(writer: &Mutex<WsSink>, message: &ExtensionMessage) -> Result<(), LinkError> {
    let json = serde_json::to_string(message)?;
    writer.lock().await.send(Message::Text(json.into())).await?;
    Ok(())
}

/// `http(s)://host:port` to `ws(s)://host:port/extension-ws`.
fn ws_url(base_url: &str) -> String {
    let rest = base_url
        .strip_prefix("https://")
        .map(|r| format!("wss://{}", r))
        .or_else(|| base_url.strip_prefix("http://").map(|r| format!("ws://{}", r)))
        .unwrap_or_else(|| format!("ws://{}", base_url));
    format!("{}/extension-ws", rest)
}
