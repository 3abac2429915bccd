//! Client configuration loaded from the environment

use std::time::Duration;
use url::Url;

use crate::types::{Authorization, Role};

pub const DEFAULT_API_ENDPOINT: &str = "https://twitch-plays-geoguessr.wl.r.appspot.com";

/// Path of the persistent channel relative to the API endpoint
const CHANNEL_PATH: &str = "ws";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend
    pub api_endpoint: String,
    /// WebSocket URL of the broadcaster's persistent channel
    pub channel_url: String,
    /// Per-request timeout (None = wait forever)
    pub request_timeout: Option<Duration>,
    /// Which controller the rig drives
    pub role: Role,
    /// Identity to authorize with on startup (rig only)
    pub identity: Option<Authorization>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            channel_url: "wss://twitch-plays-geoguessr.wl.r.appspot.com/ws".to_string(),
            request_timeout: None,
            role: Role::Viewer,
            identity: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    /// Values are trimmed; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key).and_then(|v| {
                let trimmed = v.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
        };

        let api_endpoint = get("CROWDGUESS_API_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        let channel_url = match get("CROWDGUESS_CHANNEL_URL") {
            Some(url) => {
                Url::parse(&url).map_err(|e| ConfigError::InvalidUrl {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                url
            }
            None => derive_channel_url(&api_endpoint)?,
        };

        let request_timeout = get("CROWDGUESS_REQUEST_TIMEOUT").and_then(|s| match s.parse() {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => {
                tracing::warn!("Ignoring invalid CROWDGUESS_REQUEST_TIMEOUT: {}", s);
                None
            }
        });

        let role = match get("CROWDGUESS_ROLE").as_deref() {
            Some("broadcaster") => Role::Broadcaster,
            Some("viewer") | None => Role::Viewer,
            Some(other) => {
                tracing::warn!("Unknown CROWDGUESS_ROLE {}, using viewer", other);
                Role::Viewer
            }
        };

        let identity = get("CROWDGUESS_TOKEN").map(|token| Authorization {
            token,
            identity_id: get("CROWDGUESS_USER_ID").unwrap_or_else(|| "rig-user".to_string()),
            channel_id: get("CROWDGUESS_CHANNEL_ID"),
        });

        Ok(Self {
            api_endpoint,
            channel_url,
            request_timeout,
            role,
            identity,
        })
    }
}

/// Turn `http(s)://host/base` into `ws(s)://host/base/ws`
pub fn derive_channel_url(api_endpoint: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: api_endpoint.to_string(),
        reason,
    };

    let mut url = Url::parse(api_endpoint).map_err(|e| invalid(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(invalid(format!("unsupported scheme {}", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid("cannot switch scheme".to_string()))?;

    let path = format!("{}/{}", url.path().trim_end_matches('/'), CHANNEL_PATH);
    url.set_path(&path);

    Ok(url.to_string())
}
