//! Broadcaster console controller
//!
//! Merges identity events with the persistent channel. Round commands are
//! fire-and-forget with an optimistic local update; nothing acknowledges them.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::channel::{ChannelConnector, ChannelEvent, ChannelHandle};
use crate::platform::Platform;
use crate::protocol::{ChannelClientMessage, ChannelServerMessage};
use crate::session::SessionState;
use crate::types::*;

#[derive(Debug)]
pub enum BroadcasterEvent {
    IdentityReady(Authorization),
    ContextChanged {
        context: PlatformContext,
        changed_keys: Vec<String>,
    },
    Broadcast(String),
    StartRound,
    StopRound,
    Channel(ChannelEvent),
    Shutdown,
}

pub struct BroadcasterController {
    state: SessionState,
    listening: bool,
    platform: Arc<dyn Platform>,
    connector: Arc<dyn ChannelConnector>,
    channel: Option<ChannelHandle>,
    /// Weak so that dropping every handle ends the actor loop
    events: mpsc::WeakUnboundedSender<BroadcasterEvent>,
    snapshots: watch::Sender<SessionState>,
}

impl BroadcasterController {
    pub fn new(
        platform: Arc<dyn Platform>,
        connector: Arc<dyn ChannelConnector>,
        events: &mpsc::UnboundedSender<BroadcasterEvent>,
    ) -> Self {
        let state = SessionState::new(Role::Broadcaster);
        let (snapshots, _) = watch::channel(state.clone());
        Self {
            state,
            listening: false,
            platform,
            connector,
            channel: None,
            events: events.downgrade(),
            snapshots,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshots.subscribe()
    }

    pub fn on_identity_ready(&mut self, auth: Authorization) {
        tracing::debug!(identity = %auth.identity_id, channel = ?auth.channel_id, "Identity ready");
        self.state.store_identity(&auth);

        if !self.state.begin_initialization() {
            tracing::debug!("Token refreshed, channel already opened");
            return;
        }

        tracing::info!(channel = ?self.state.channel_id, "Initializing broadcaster console");
        self.platform.listen_broadcast();
        self.listening = true;

        let events = self.events.clone();
        let handle = self.connector.open(Box::new(move |event| {
            if let Some(events) = events.upgrade() {
                let _ = events.send(BroadcasterEvent::Channel(event));
            }
        }));
        self.channel = Some(handle);
    }

    pub fn on_context_changed(&mut self, context: &PlatformContext, changed_keys: &[String]) {
        self.state.apply_context(context, changed_keys);
    }

    /// Registered for parity with the viewer; no signal changes console state yet.
    pub fn on_broadcast(&mut self, payload: &str) {
        tracing::debug!("Broadcast message: {}", payload);
    }

    pub fn start_round(&mut self) {
        self.state.set_round_active(true);
        if let Some(token) = self.state.auth_token.clone() {
            self.send_command(ChannelClientMessage::StartRound { token });
        }
    }

    pub fn stop_round(&mut self) {
        self.state.set_round_active(false);
        if let Some(token) = self.state.auth_token.clone() {
            self.send_command(ChannelClientMessage::StopRound { token });
        }
    }

    fn send_command(&self, message: ChannelClientMessage) {
        let event = message.event_name();

        if self.state.connection_state != ConnectionState::Connected {
            tracing::warn!(
                connection = ?self.state.connection_state,
                "Channel not connected, '{}' not delivered",
                event
            );
            return;
        }
        let Some(channel) = &self.channel else {
            tracing::warn!("No channel open, '{}' not delivered", event);
            return;
        };

        match channel.send(message) {
            Ok(()) => tracing::info!("Sent '{}'", event),
            Err(e) => tracing::warn!("Failed to send '{}': {}", event, e),
        }
    }

    pub fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.state.connection_state = ConnectionState::Connected;
                tracing::info!("Persistent channel connected");

                match (&self.state.channel_id, &self.state.auth_token) {
                    (Some(channel), Some(token)) => {
                        self.send_command(ChannelClientMessage::Join {
                            channel: channel.clone(),
                            token: token.clone(),
                        });
                    }
                    _ => tracing::warn!("Connected without channel id or token, not joining"),
                }
            }
            ChannelEvent::Message(ChannelServerMessage::Vote(payload)) => {
                if self.state.apply_vote(&payload) {
                    tracing::debug!(
                        count = self.state.submission_count,
                        average = ?self.state.current_aggregate,
                        "Aggregate updated"
                    );
                }
            }
            ChannelEvent::Disconnected => {
                self.state.connection_state = ConnectionState::Disconnected;
                tracing::warn!("Persistent channel disconnected, reload to reconnect");
            }
        }
    }

    /// Release the listener and the socket. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.listening {
            self.platform.unlisten_broadcast();
            self.listening = false;
        }
        if let Some(channel) = self.channel.take() {
            channel.close();
            tracing::info!("Broadcaster console torn down");
        }
    }

    /// Handle one event and publish the resulting state.
    /// Returns false once the controller has shut down.
    pub fn handle(&mut self, event: BroadcasterEvent) -> bool {
        let keep_running = match event {
            BroadcasterEvent::IdentityReady(auth) => {
                self.on_identity_ready(auth);
                true
            }
            BroadcasterEvent::ContextChanged {
                context,
                changed_keys,
            } => {
                self.on_context_changed(&context, &changed_keys);
                true
            }
            BroadcasterEvent::Broadcast(payload) => {
                self.on_broadcast(&payload);
                true
            }
            BroadcasterEvent::StartRound => {
                self.start_round();
                true
            }
            BroadcasterEvent::StopRound => {
                self.stop_round();
                true
            }
            BroadcasterEvent::Channel(event) => {
                self.on_channel_event(event);
                true
            }
            BroadcasterEvent::Shutdown => {
                self.shutdown();
                false
            }
        };

        self.snapshots.send_replace(self.state.clone());
        keep_running
    }

    /// Drive the controller until shutdown or until every sender is gone
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<BroadcasterEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                return;
            }
        }
        self.shutdown();
    }
}

/// Cloneable front for a broadcaster controller running on its own task
#[derive(Clone)]
pub struct BroadcasterHandle {
    events: mpsc::UnboundedSender<BroadcasterEvent>,
    state: watch::Receiver<SessionState>,
}

impl BroadcasterHandle {
    pub fn spawn(platform: Arc<dyn Platform>, connector: Arc<dyn ChannelConnector>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = BroadcasterController::new(platform, connector, &tx);
        let state = controller.subscribe();
        tokio::spawn(controller.run(rx));
        Self { events: tx, state }
    }

    /// Queue an event. Events sent after shutdown are dropped.
    pub fn send(&self, event: BroadcasterEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Broadcaster controller has stopped, event dropped");
        }
    }

    pub fn identity_ready(&self, auth: Authorization) {
        self.send(BroadcasterEvent::IdentityReady(auth));
    }

    pub fn start_round(&self) {
        self.send(BroadcasterEvent::StartRound);
    }

    pub fn stop_round(&self) {
        self.send(BroadcasterEvent::StopRound);
    }

    pub fn shutdown(&self) {
        self.send(BroadcasterEvent::Shutdown);
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}
