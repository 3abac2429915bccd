//! Viewer session controller
//!
//! Owns the viewer's `SessionState` and is its only mutator. Events from the
//! platform, the UI and finished network calls all arrive on one queue and are
//! handled one at a time, so no two handlers ever interleave.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::api::{ApiResult, SessionApi};
use crate::classify::{classify_submission, BroadcastSignal, SubmitReply};
use crate::platform::Platform;
use crate::protocol::StateSnapshot;
use crate::session::SessionState;
use crate::types::*;

#[derive(Debug)]
pub enum ViewerEvent {
    IdentityReady(Authorization),
    ContextChanged {
        context: PlatformContext,
        changed_keys: Vec<String>,
    },
    VisibilityChanged(bool),
    /// Raw payload from the platform broadcast topic
    Broadcast(String),
    CoordinateSelected(LatLng),
    SubmitRequested,
    StateFetched {
        issued_epoch: u64,
        result: ApiResult<StateSnapshot>,
    },
    SubmitFinished {
        attempt: ulid::Ulid,
        result: ApiResult<SubmitReply>,
    },
    Shutdown,
}

pub struct ViewerController {
    state: SessionState,
    listening: bool,
    platform: Arc<dyn Platform>,
    api: Arc<dyn SessionApi>,
    /// Weak so that dropping every handle ends the actor loop
    events: mpsc::WeakUnboundedSender<ViewerEvent>,
    snapshots: watch::Sender<SessionState>,
}

impl ViewerController {
    /// `events` must feed the queue this controller is driven from; finished
    /// network calls are posted back through it while the caller keeps it alive.
    pub fn new(
        platform: Arc<dyn Platform>,
        api: Arc<dyn SessionApi>,
        events: &mpsc::UnboundedSender<ViewerEvent>,
    ) -> Self {
        let state = SessionState::new(Role::Viewer);
        let (snapshots, _) = watch::channel(state.clone());
        Self {
            state,
            listening: false,
            platform,
            api,
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
        tracing::debug!(identity = %auth.identity_id, "Identity ready");
        self.state.store_identity(&auth);

        if !self.state.begin_initialization() {
            tracing::debug!("Token refreshed, setup already done");
            return;
        }

        tracing::info!(identity = %auth.identity_id, "Initializing viewer session");
        self.platform.listen_broadcast();
        self.listening = true;
        self.fetch_initial_state(auth.token);
    }

    fn fetch_initial_state(&self, token: AuthToken) {
        let api = self.api.clone();
        let events = self.events.clone();
        let issued_epoch = self.state.lifecycle_epoch;

        tokio::spawn(async move {
            let result = api.fetch_state(&token).await;
            if let Some(events) = events.upgrade() {
                let _ = events.send(ViewerEvent::StateFetched {
                    issued_epoch,
                    result,
                });
            }
        });
    }

    pub fn on_state_fetched(&mut self, issued_epoch: u64, result: ApiResult<StateSnapshot>) {
        match result {
            Ok(snapshot) => {
                if self.state.merge_snapshot(&snapshot, issued_epoch) {
                    tracing::info!(
                        channel_active = self.state.channel_active,
                        round_active = self.state.round_active,
                        "Initial state loaded"
                    );
                }
            }
            Err(e) => {
                // Viewer simply sees "not active yet"
                tracing::warn!("Initial state fetch failed: {}", e);
            }
        }
    }

    pub fn on_context_changed(&mut self, context: &PlatformContext, changed_keys: &[String]) {
        self.state.apply_context(context, changed_keys);
    }

    pub fn on_visibility_changed(&mut self, visible: bool) {
        self.state.visible = visible;
    }

    /// Raw broadcast payload. Unrecognized payloads are ignored.
    pub fn on_broadcast(&mut self, payload: &str) {
        tracing::debug!("Broadcast message: {}", payload);

        if !self.listening {
            tracing::debug!("Broadcast listener not registered, ignoring");
            return;
        }

        match BroadcastSignal::parse(payload) {
            Some(signal) => self.on_broadcast_signal(signal),
            None => tracing::debug!("Ignoring unrecognized broadcast payload"),
        }
    }

    pub fn on_broadcast_signal(&mut self, signal: BroadcastSignal) {
        self.state.apply_signal(signal);
        tracing::info!(
            %signal,
            channel_active = self.state.channel_active,
            round_active = self.state.round_active,
            "Lifecycle signal applied"
        );
    }

    pub fn select_coordinate(&mut self, coordinate: LatLng) {
        self.state.selected_coordinate = Some(coordinate);
    }

    /// Submit the selected coordinate. Returns whether a request was issued.
    pub fn submit_guess(&mut self) -> bool {
        let Some(coordinate) = self.state.submittable_coordinate() else {
            tracing::debug!(
                channel_active = self.state.channel_active,
                round_active = self.state.round_active,
                has_selection = self.state.selected_coordinate.is_some(),
                "Submit not allowed right now"
            );
            return false;
        };
        let Some(token) = self.state.auth_token.clone() else {
            tracing::warn!("Submit requested without an identity token");
            return false;
        };

        let attempt = ulid::Ulid::new();
        tracing::info!(%attempt, lat = coordinate.lat, lng = coordinate.lng, "Submitting guess");

        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = api.submit(&token, coordinate).await;
            match events.upgrade() {
                Some(events) => {
                    let _ = events.send(ViewerEvent::SubmitFinished { attempt, result });
                }
                None => tracing::debug!(%attempt, "Viewer gone, submission result dropped"),
            }
        });
        true
    }

    pub fn on_submit_finished(&mut self, attempt: ulid::Ulid, result: ApiResult<SubmitReply>) {
        let outcome = match &result {
            Ok(reply) => classify_submission(Some(reply)),
            Err(e) => {
                tracing::warn!(%attempt, "Submission failed: {}", e);
                classify_submission(None)
            }
        };

        match outcome {
            Some(outcome) => {
                tracing::info!(%attempt, %outcome, "Submission classified");
                self.state.request_outcome = Some(outcome);
            }
            None => tracing::debug!(%attempt, "Submission response left outcome unchanged"),
        }
    }

    /// Release the broadcast listener. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.listening {
            self.platform.unlisten_broadcast();
            self.listening = false;
            tracing::info!("Viewer session torn down");
        }
    }

    /// Handle one event and publish the resulting state.
    /// Returns false once the controller has shut down.
    pub fn handle(&mut self, event: ViewerEvent) -> bool {
        let keep_running = match event {
            ViewerEvent::IdentityReady(auth) => {
                self.on_identity_ready(auth);
                true
            }
            ViewerEvent::ContextChanged {
                context,
                changed_keys,
            } => {
                self.on_context_changed(&context, &changed_keys);
                true
            }
            ViewerEvent::VisibilityChanged(visible) => {
                self.on_visibility_changed(visible);
                true
            }
            ViewerEvent::Broadcast(payload) => {
                self.on_broadcast(&payload);
                true
            }
            ViewerEvent::CoordinateSelected(coordinate) => {
                self.select_coordinate(coordinate);
                true
            }
            ViewerEvent::SubmitRequested => {
                self.submit_guess();
                true
            }
            ViewerEvent::StateFetched {
                issued_epoch,
                result,
            } => {
                self.on_state_fetched(issued_epoch, result);
                true
            }
            ViewerEvent::SubmitFinished { attempt, result } => {
                self.on_submit_finished(attempt, result);
                true
            }
            ViewerEvent::Shutdown => {
                self.shutdown();
                false
            }
        };

        self.snapshots.send_replace(self.state.clone());
        keep_running
    }

    /// Drive the controller until shutdown or until every sender is gone
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ViewerEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                return;
            }
        }
        self.shutdown();
    }
}

/// Cloneable front for a viewer controller running on its own task
#[derive(Clone)]
pub struct ViewerHandle {
    events: mpsc::UnboundedSender<ViewerEvent>,
    state: watch::Receiver<SessionState>,
}

impl ViewerHandle {
    pub fn spawn(platform: Arc<dyn Platform>, api: Arc<dyn SessionApi>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = ViewerController::new(platform, api, &tx);
        let state = controller.subscribe();
        tokio::spawn(controller.run(rx));
        Self { events: tx, state }
    }

    /// Queue an event. Events sent after shutdown are dropped.
    pub fn send(&self, event: ViewerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Viewer controller has stopped, event dropped");
        }
    }

    pub fn identity_ready(&self, auth: Authorization) {
        self.send(ViewerEvent::IdentityReady(auth));
    }

    pub fn broadcast(&self, payload: impl Into<String>) {
        self.send(ViewerEvent::Broadcast(payload.into()));
    }

    pub fn select_coordinate(&self, coordinate: LatLng) {
        self.send(ViewerEvent::CoordinateSelected(coordinate));
    }

    pub fn submit(&self) {
        self.send(ViewerEvent::SubmitRequested);
    }

    pub fn shutdown(&self) {
        self.send(ViewerEvent::Shutdown);
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}
