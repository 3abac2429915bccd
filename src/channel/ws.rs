//! WebSocket implementation of the persistent channel using tokio-tungstenite

use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ChannelCommand, ChannelConnector, ChannelEvent, ChannelEventSink, ChannelHandle};
use crate::protocol::ChannelServerMessage;

/// Connects to the backend over a WebSocket carrying JSON text frames
#[derive(Debug, Clone)]
pub struct WsChannelConnector {
    url: String,
}

impl WsChannelConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChannelConnector for WsChannelConnector {
    fn open(&self, on_event: ChannelEventSink) -> ChannelHandle {
        let (handle, commands) = ChannelHandle::new();
        tokio::spawn(run_connection(self.url.clone(), commands, on_event));
        handle
    }
}

async fn run_connection(
    url: String,
    mut commands: mpsc::UnboundedReceiver<ChannelCommand>,
    on_event: ChannelEventSink,
) {
    tracing::info!("Connecting persistent channel to {}", url);

    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    // Wait for the handshake, but stop early if the owner tears down first
    let ws_stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _)) => break stream,
                Err(e) => {
                    tracing::error!("Failed to connect persistent channel: {}", e);
                    on_event(ChannelEvent::Disconnected);
                    return;
                }
            },
            cmd = commands.recv() => match cmd {
                Some(ChannelCommand::Send(msg)) => {
                    tracing::warn!("Dropping '{}' sent before the channel connected", msg.event_name());
                }
                Some(ChannelCommand::Close) | None => {
                    tracing::info!("Channel closed before it connected");
                    return;
                }
            },
        }
    };

    tracing::info!("Persistent channel connected");
    on_event(ChannelEvent::Connected);

    let (mut sender, mut receiver) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(ChannelCommand::Send(msg)) => {
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize channel message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(json.into())).await {
                        tracing::error!("Failed to send '{}': {}", msg.event_name(), e);
                        break;
                    }
                }
                Some(ChannelCommand::Close) | None => {
                    tracing::info!("Closing persistent channel");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            },

            ws_msg = receiver.next() => match ws_msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ChannelServerMessage>(&text) {
                        Ok(msg) => on_event(ChannelEvent::Message(msg)),
                        Err(e) => tracing::debug!("Ignoring channel message {}: {}", text.as_str(), e),
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    tracing::info!("Backend closed persistent channel");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("Persistent channel error: {}", e);
                    break;
                }
                None => break,
            },
        }
    }

    on_event(ChannelEvent::Disconnected);
}
