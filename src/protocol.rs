use crate::types::*;
use serde::{Deserialize, Serialize};

/// Body of `POST /submit`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub lat_lng: LatLng,
}

/// Body of `GET /state`. Only fields that are present get merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_active: Option<bool>,
}

/// Messages the broadcaster console sends over the persistent channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ChannelClientMessage {
    #[serde(rename = "join")]
    Join { channel: ChannelId, token: AuthToken },
    #[serde(rename = "start round")]
    StartRound { token: AuthToken },
    #[serde(rename = "stop round")]
    StopRound { token: AuthToken },
}

impl ChannelClientMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::StartRound { .. } => "start round",
            Self::StopRound { .. } => "stop round",
        }
    }
}

/// Messages the backend pushes to the broadcaster console
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ChannelServerMessage {
    #[serde(rename = "vote")]
    Vote(VotePayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotePayload {
    pub count: u64,
    #[serde(default)]
    pub average: Option<WireCoordinate>,
    /// Monotonic sequence number, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl VotePayload {
    pub fn aggregate(&self) -> Aggregate {
        Aggregate {
            count: self.count,
            average: self.average.map(LatLng::from),
        }
    }
}

/// The backend sends averages as `[lat, lng]`; `{lat, lng}` is accepted too.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireCoordinate {
    Pair([f64; 2]),
    Object(LatLng),
}

impl From<WireCoordinate> for LatLng {
    fn from(c: WireCoordinate) -> Self {
        match c {
            WireCoordinate::Pair([lat, lng]) => LatLng { lat, lng },
            WireCoordinate::Object(latlng) => latlng,
        }
    }
}
