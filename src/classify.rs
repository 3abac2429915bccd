//! Event classification shared by both controllers
//!
//! Closed enumerations for the broadcast signal and the request outcome,
//! parsed with an explicit "unrecognized value -> None" rule. Callers treat
//! `None` as a no-op, never as a default variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle signal delivered over the platform broadcast channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastSignal {
    Start,
    Stop,
    Activate,
    Deactivate,
}

impl BroadcastSignal {
    /// Exact match; anything else, including padded payloads, is unrecognized
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            "START" => Some(Self::Start),
            "STOP" => Some(Self::Stop),
            "ACTIVATE" => Some(Self::Activate),
            "DEACTIVATE" => Some(Self::Deactivate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Stop => "STOP",
            Self::Activate => "ACTIVATE",
            Self::Deactivate => "DEACTIVATE",
        }
    }
}

impl fmt::Display for BroadcastSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of a guess submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestOutcome {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED_UNKNOWN")]
    Unknown,
    #[serde(rename = "FAILED_AUTH")]
    AuthFailed,
    #[serde(rename = "FAILED_STREAMER_NOT_ACTIVE")]
    StreamerNotActive,
    #[serde(rename = "FAILED_ROUND_NOT_ACTIVE")]
    RoundNotActive,
    #[serde(rename = "FAILED_ALREADY_VOTED")]
    AlreadyVoted,
}

impl RequestOutcome {
    pub fn parse(message: &str) -> Option<Self> {
        match message {
            "SUCCESS" => Some(Self::Success),
            "FAILED_UNKNOWN" => Some(Self::Unknown),
            "FAILED_AUTH" => Some(Self::AuthFailed),
            "FAILED_STREAMER_NOT_ACTIVE" => Some(Self::StreamerNotActive),
            "FAILED_ROUND_NOT_ACTIVE" => Some(Self::RoundNotActive),
            "FAILED_ALREADY_VOTED" => Some(Self::AlreadyVoted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unknown => "FAILED_UNKNOWN",
            Self::AuthFailed => "FAILED_AUTH",
            Self::StreamerNotActive => "FAILED_STREAMER_NOT_ACTIVE",
            Self::RoundNotActive => "FAILED_ROUND_NOT_ACTIVE",
            Self::AlreadyVoted => "FAILED_ALREADY_VOTED",
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw response of the submission endpoint, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReply {
    pub status: u16,
    pub body: String,
}

/// Map a submission attempt to the outcome to store.
///
/// `None` for the transport means no response reached us. A `None` result
/// means "keep whatever was stored before".
pub fn classify_submission(reply: Option<&SubmitReply>) -> Option<RequestOutcome> {
    let Some(reply) = reply else {
        return Some(RequestOutcome::Unknown);
    };

    if reply.status == 401 || reply.status == 403 {
        return Some(RequestOutcome::AuthFailed);
    }

    let body: serde_json::Value = match serde_json::from_str(&reply.body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(status = reply.status, "Unparseable submit response: {}", e);
            return Some(RequestOutcome::Unknown);
        }
    };

    let outcome = body
        .get("message")
        .and_then(|m| m.as_str())
        .and_then(RequestOutcome::parse);

    if outcome.is_none() {
        tracing::debug!(status = reply.status, "Ignoring unrecognized submit response: {}", body);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> SubmitReply {
        SubmitReply {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_broadcast_signals() {
        assert_eq!(BroadcastSignal::parse("START"), Some(BroadcastSignal::Start));
        assert_eq!(BroadcastSignal::parse("STOP"), Some(BroadcastSignal::Stop));
        assert_eq!(
            BroadcastSignal::parse("ACTIVATE"),
            Some(BroadcastSignal::Activate)
        );
        assert_eq!(
            BroadcastSignal::parse("DEACTIVATE"),
            Some(BroadcastSignal::Deactivate)
        );

        assert_eq!(BroadcastSignal::parse("DEACTIVATE\n"), None);
        assert_eq!(BroadcastSignal::parse(" START"), None);
        assert_eq!(BroadcastSignal::parse("start"), None);
        assert_eq!(BroadcastSignal::parse(""), None);
        assert_eq!(BroadcastSignal::parse("RESET"), None);
    }

    #[test]
    fn test_transport_failure_is_unknown() {
        assert_eq!(classify_submission(None), Some(RequestOutcome::Unknown));
    }

    #[test]
    fn test_auth_status_wins_over_body() {
        let r = reply(403, r#"{"message":"SUCCESS"}"#);
        assert_eq!(classify_submission(Some(&r)), Some(RequestOutcome::AuthFailed));

        let r = reply(401, "not json");
        assert_eq!(classify_submission(Some(&r)), Some(RequestOutcome::AuthFailed));
    }

    #[test]
    fn test_recognized_messages_are_stored_verbatim() {
        let cases = [
            ("SUCCESS", RequestOutcome::Success),
            ("FAILED_UNKNOWN", RequestOutcome::Unknown),
            ("FAILED_AUTH", RequestOutcome::AuthFailed),
            ("FAILED_STREAMER_NOT_ACTIVE", RequestOutcome::StreamerNotActive),
            ("FAILED_ROUND_NOT_ACTIVE", RequestOutcome::RoundNotActive),
            ("FAILED_ALREADY_VOTED", RequestOutcome::AlreadyVoted),
        ];

        for (message, expected) in cases {
            let r = reply(200, &format!(r#"{{"message":"{}"}}"#, message));
            assert_eq!(classify_submission(Some(&r)), Some(expected), "{}", message);
        }
    }

    #[test]
    fn test_error_status_still_reads_body() {
        // The backend reports business failures with non-2xx codes too
        let r = reply(400, r#"{"message":"FAILED_ROUND_NOT_ACTIVE"}"#);
        assert_eq!(
            classify_submission(Some(&r)),
            Some(RequestOutcome::RoundNotActive)
        );
    }

    #[test]
    fn test_unrecognized_message_is_ignored() {
        assert_eq!(classify_submission(Some(&reply(200, r#"{"message":"BOGUS"}"#))), None);
        assert_eq!(classify_submission(Some(&reply(200, r#"{"ok":true}"#))), None);
        assert_eq!(classify_submission(Some(&reply(200, r#"{"message":7}"#))), None);
    }

    #[test]
    fn test_unparseable_body_is_unknown() {
        let r = reply(502, "<html>Bad Gateway</html>");
        assert_eq!(classify_submission(Some(&r)), Some(RequestOutcome::Unknown));
    }

    #[test]
    fn test_outcome_serde_uses_wire_names() {
        let json = serde_json::to_string(&RequestOutcome::AlreadyVoted).unwrap();
        assert_eq!(json, r#""FAILED_ALREADY_VOTED""#);
    }
}
