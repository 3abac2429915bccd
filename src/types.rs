use serde::{Deserialize, Serialize};

/// Opaque identity attributes handed out by the platform
pub type AuthToken = String;
pub type IdentityId = String;
pub type ChannelId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Broadcaster,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Class suffix used by the presentation layer
    pub fn class_suffix(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Lifecycle of the broadcaster's persistent channel
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

/// A point picked on the map. Bounds are the map collaborator's concern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Running tally pushed by the backend to the broadcaster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub count: u64,
    pub average: Option<LatLng>,
}

/// Payload of the platform's "authorized" event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub token: AuthToken,
    #[serde(alias = "userId")]
    pub identity_id: IdentityId,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
}

/// Platform context delivered with "context changed" events.
/// Only the theme is consumed; everything else is carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlatformContext {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_accepts_platform_field_names() {
        let auth: Authorization = serde_json::from_str(
            r#"{"token":"tok","userId":"U123","channelId":"C9","clientId":"x"}"#,
        )
        .unwrap();

        assert_eq!(auth.token, "tok");
        assert_eq!(auth.identity_id, "U123");
        assert_eq!(auth.channel_id.as_deref(), Some("C9"));
    }

    #[test]
    fn test_context_keeps_unknown_keys() {
        let ctx: PlatformContext =
            serde_json::from_str(r#"{"theme":"dark","language":"de","isFullScreen":false}"#)
                .unwrap();

        assert_eq!(ctx.theme, Some(Theme::Dark));
        assert_eq!(ctx.other.len(), 2);
    }
}
