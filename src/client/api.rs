//! HTTP calls the display client makes against the metrics server.

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::API_KEY_HEADER;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::snapshot::AllMetrics;

/// Body of a successful privileged request.
#[derive(Debug, Deserialize)]
pub struct ActionReply {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

pub struct MetricsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl MetricsClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/all`.
    pub async fn fetch_all(&self) -> Result<AllMetrics, ClientError> {
        let resp = self
            .http
            .get(format!("{}/api/all", self.base_url))
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let resp = check_status(resp).await?;
        let body = resp.text().await.map_err(ClientError::Transport)?;

        serde_json::from_str(&body).map_err(|e| {
            debug!("Undecodable /api/all body: {}", body);
            ClientError::MalformedBody(e.to_string())
        })
    }

    /// `POST /api/shutdown`.
    pub async fn send_shutdown(&self) -> Result<ActionReply, ClientError> {
        self.post_action("/api/shutdown").await
    }

    /// `POST /api/update`. The server answers only after every update step
    /// has run, so this can outlive the configured request timeout.
    pub async fn send_update(&self) -> Result<ActionReply, ClientError> {
        self.post_action("/api/update").await
    }

    async fn post_action(&self, path: &str) -> Result<ActionReply, ClientError> {
        let mut req = self.http.post(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        } else {
            warn!("No api_key configured, {} will be rejected", path);
        }
        if path == "/api/update" {
            req = req.timeout(UPDATE_TIMEOUT);
        }

        let resp = req.send().await.map_err(ClientError::Transport)?;
        let resp = check_status(resp).await?;

        resp.json::<ActionReply>()
            .await
            .map_err(|e| ClientError::MalformedBody(e.to_string()))
    }
}

/// Upper bound for the blocking update call.
const UPDATE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Turns every non-200 answer into a [`ClientError`].
async fn check_status(resp: Response) -> Result<Response, ClientError> {
    match resp.status() {
        StatusCode::OK => Ok(resp),
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => Err(ClientError::RateLimited),
        status => {
            let text = resp.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ErrorReply>(&text)
                .map(|r| r.error)
                .unwrap_or(text);
            Err(ClientError::HttpStatus {
                code: status.as_u16(),
                body,
            })
        }
    }
}
