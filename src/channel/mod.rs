//! Persistent bidirectional channel between the broadcaster console and the
//! backend.
//!
//! A connector starts the connection in the background and reports lifecycle
//! changes and inbound messages through a callback. The returned handle is the
//! only way to write to the socket.

mod ws;

pub use ws::WsChannelConnector;

use tokio::sync::mpsc;

use crate::protocol::{ChannelClientMessage, ChannelServerMessage};

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel closed")]
    Closed,
}

/// Something that happened on the channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Message(ChannelServerMessage),
    Disconnected,
}

/// Callback invoked for every channel event, in order
pub type ChannelEventSink = Box<dyn Fn(ChannelEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCommand {
    Send(ChannelClientMessage),
    Close,
}

/// Write half of an open channel
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    tx: mpsc::UnboundedSender<ChannelCommand>,
}

impl ChannelHandle {
    /// Create a handle together with the receiving end the connection task drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, message: ChannelClientMessage) -> ChannelResult<()> {
        self.tx
            .send(ChannelCommand::Send(message))
            .map_err(|_| ChannelError::Closed)
    }

    /// Ask the connection task to close the socket. Best effort.
    pub fn close(&self) {
        let _ = self.tx.send(ChannelCommand::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Opens persistent channels
pub trait ChannelConnector: Send + Sync {
    fn open(&self, on_event: ChannelEventSink) -> ChannelHandle;
}
