//! Transport between the device-flow state machine and the identity provider.

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use crate::config::{Config, USER_AGENT};
use crate::error::{Error, Result};
use crate::models::{DeviceAuthorization, DeviceCodeRequest, PollResponse, TokenRequest};

/// Media type the GitHub API expects on OAuth and REST calls
pub(crate) const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// The two calls the device flow makes against an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask for a device code and user code.
    async fn request_device_code(
        &self,
        client_id: &str,
        scope: Option<&str>,
    ) -> Result<DeviceAuthorization>;

    /// Exchange a device code for a token, or learn why not yet.
    async fn poll_token(&self, client_id: &str, device_code: &str) -> Result<PollResponse>;
}

/// Identity provider reached over HTTP with JSON bodies.
/// Clone is cheap - reqwest::Client uses Arc internally.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    device_code_url: String,
    token_url: String,
}

impl HttpIdentityProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            device_code_url: config.device_code_url().to_string(),
            token_url: config.token_url().to_string(),
        }
    }

    fn headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
        headers
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn request_device_code(
        &self,
        client_id: &str,
        scope: Option<&str>,
    ) -> Result<DeviceAuthorization> {
        let body = serde_json::to_vec(&DeviceCodeRequest { client_id, scope })?;
        let response = self
            .client
            .post(&self.device_code_url)
            .headers(Self::headers())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::from_status(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| Error::InvalidResponse(format!("device code response: {}", e)))
    }

    async fn poll_token(&self, client_id: &str, device_code: &str) -> Result<PollResponse> {
        let body = serde_json::to_vec(&TokenRequest::new(client_id, device_code))?;
        let response = self
            .client
            .post(&self.token_url)
            .headers(Self::headers())
            .body(body)
            .send()
            .await?;

        // Errors like `authorization_pending` may come with any status, so the
        // body decides and the status only matters when the body is unreadable.
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, "Token poll response received");
        match serde_json::from_str(&text) {
            Ok(poll) => Ok(poll),
            Err(_) if !status.is_success() => Err(Error::from_status(status, &text)),
            Err(e) => Err(Error::InvalidResponse(format!("token poll response: {}", e))),
        }
    }
}
