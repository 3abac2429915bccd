//! REST client for the session backend.
//!
//! Two endpoints, both bearer-authenticated with the platform token:
//! - `GET /state` returns the current channel/round flags
//! - `POST /submit` records a viewer's guess

use async_trait::async_trait;
use std::time::Duration;

use crate::classify::SubmitReply;
use crate::config::ClientConfig;
use crate::protocol::{StateSnapshot, SubmitRequest};
use crate::types::LatLng;

/// Result type for backend calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the backend
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend returned status: {0}")]
    Status(u16),

    #[error("Response parsing failed: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Backend operations the viewer controller depends on
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Fetch the current session flags. Any non-2xx status is an error.
    async fn fetch_state(&self, token: &str) -> ApiResult<StateSnapshot>;

    /// Submit a guess. Every HTTP response, whatever its status, comes back
    /// as `Ok`; `Err` means no response reached us.
    async fn submit(&self, token: &str, coordinate: LatLng) -> ApiResult<SubmitReply>;
}

/// `SessionApi` over HTTP using reqwest
pub struct HttpSessionApi {
    base_url: String,
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpSessionApi {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> ApiResult<Self> {
        Self::new(config.api_endpoint.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ApiResult<reqwest::Response> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, request.send())
                .await
                .map_err(|_| ApiError::Timeout(timeout))?
                .map_err(|e| ApiError::Transport(e.to_string())),
            None => request
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string())),
        }
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn fetch_state(&self, token: &str) -> ApiResult<StateSnapshot> {
        let url = format!("{}/state", self.base_url);
        tracing::debug!("GET {}", url);

        let response = self.send(self.client.get(&url).bearer_auth(token)).await?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        response
            .json::<StateSnapshot>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn submit(&self, token: &str, coordinate: LatLng) -> ApiResult<SubmitReply> {
        let url = format!("{}/submit", self.base_url);
        tracing::debug!("POST {} lat={} lng={}", url, coordinate.lat, coordinate.lng);

        let body = SubmitRequest {
            lat_lng: coordinate,
        };
        let response = self
            .send(self.client.post(&url).bearer_auth(token).json(&body))
            .await?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(SubmitReply { status, body })
    }
}
