//! Session state and the merge rules shared by both roles

use crate::classify::{BroadcastSignal, RequestOutcome};
use crate::protocol::{StateSnapshot, VotePayload};
use crate::types::*;

/// Process-local state owned by exactly one controller
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub role: Role,
    pub initialized: bool,

    pub auth_token: Option<AuthToken>,
    pub identity_id: Option<IdentityId>,
    pub channel_id: Option<ChannelId>,

    pub visible: bool,
    pub theme: Theme,

    pub channel_active: bool,
    pub round_active: bool,

    pub selected_coordinate: Option<LatLng>,
    pub request_outcome: Option<RequestOutcome>,

    pub connection_state: ConnectionState,
    pub submission_count: u64,
    pub current_aggregate: Option<LatLng>,

    /// Number of broadcast signals applied so far
    pub lifecycle_epoch: u64,
    /// Epoch of the last signal that set `channel_active` (0 = none yet)
    pub channel_signal_epoch: u64,
    /// Epoch of the last signal that set `round_active` (0 = none yet)
    pub round_signal_epoch: u64,
    /// Highest `seq` applied from a vote payload
    pub last_vote_seq: Option<u64>,
}

impl SessionState {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            initialized: false,
            auth_token: None,
            identity_id: None,
            channel_id: None,
            visible: true,
            theme: Theme::default(),
            channel_active: false,
            round_active: false,
            selected_coordinate: None,
            request_outcome: None,
            connection_state: ConnectionState::Connecting,
            submission_count: 0,
            current_aggregate: None,
            lifecycle_epoch: 0,
            channel_signal_epoch: 0,
            round_signal_epoch: 0,
            last_vote_seq: None,
        }
    }

    /// Store identity attributes. A missing channel id keeps the previous one.
    pub fn store_identity(&mut self, auth: &Authorization) {
        self.auth_token = Some(auth.token.clone());
        self.identity_id = Some(auth.identity_id.clone());
        if let Some(channel_id) = &auth.channel_id {
            self.channel_id = Some(channel_id.clone());
        }
    }

    /// Flip `initialized`. Returns true only on the false -> true transition,
    /// which is the single point where one-time setup may run.
    pub fn begin_initialization(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        true
    }

    pub fn apply_context(&mut self, context: &PlatformContext, changed_keys: &[String]) {
        if !changed_keys.iter().any(|k| k == "theme") {
            return;
        }
        if let Some(theme) = context.theme {
            self.theme = theme;
        }
    }

    /// Apply a lifecycle signal. Every signal clears the stored outcome,
    /// even when the flag it targets already had the signalled value.
    pub fn apply_signal(&mut self, signal: BroadcastSignal) {
        self.lifecycle_epoch += 1;
        match signal {
            BroadcastSignal::Start | BroadcastSignal::Stop => {
                self.round_active = signal == BroadcastSignal::Start;
                self.round_signal_epoch = self.lifecycle_epoch;
            }
            BroadcastSignal::Activate | BroadcastSignal::Deactivate => {
                self.channel_active = signal == BroadcastSignal::Activate;
                self.channel_signal_epoch = self.lifecycle_epoch;
            }
        }
        self.request_outcome = None;
    }

    pub fn set_round_active(&mut self, active: bool) {
        if self.round_active != active {
            self.round_active = active;
            self.request_outcome = None;
        }
    }

    pub fn set_channel_active(&mut self, active: bool) {
        if self.channel_active != active {
            self.channel_active = active;
            self.request_outcome = None;
        }
    }

    /// Merge an initial-fetch snapshot issued at `issued_epoch`.
    ///
    /// A flag set by a broadcast signal after the fetch went out is newer than
    /// the snapshot's value for it and is kept; every other returned field is
    /// merged. Returns whether anything was merged.
    pub fn merge_snapshot(&mut self, snapshot: &StateSnapshot, issued_epoch: u64) -> bool {
        let mut merged = false;

        if let Some(active) = snapshot.channel_active {
            if self.channel_signal_epoch > issued_epoch {
                tracing::debug!(issued_epoch, "Keeping channel flag set by a newer signal");
            } else {
                self.set_channel_active(active);
                merged = true;
            }
        }
        if let Some(active) = snapshot.round_active {
            if self.round_signal_epoch > issued_epoch {
                tracing::debug!(issued_epoch, "Keeping round flag set by a newer signal");
            } else {
                self.set_round_active(active);
                merged = true;
            }
        }
        merged
    }

    /// Coordinate to submit, if the submit precondition holds
    pub fn submittable_coordinate(&self) -> Option<LatLng> {
        if self.channel_active && self.round_active {
            self.selected_coordinate
        } else {
            None
        }
    }

    /// Replace count and average wholesale. Payloads carrying a `seq` that is
    /// not newer than the last applied one are dropped.
    pub fn apply_vote(&mut self, payload: &VotePayload) -> bool {
        if let (Some(seq), Some(last)) = (payload.seq, self.last_vote_seq) {
            if seq <= last {
                tracing::debug!(seq, last, "Dropping out-of-order vote update");
                return false;
            }
        }
        if payload.seq.is_some() {
            self.last_vote_seq = payload.seq;
        }

        let aggregate = payload.aggregate();
        self.submission_count = aggregate.count;
        self.current_aggregate = aggregate.average;
        true
    }
}
