//! API client for the package registry and the identity provider's user API.
//!
//! This module provides the `RegistryClient` struct for the calls that need
//! a logged-in session: publishing, `whoami`, and logging out.

use reqwest::{header, Client, StatusCode};
use tracing::{debug, info};

use crate::auth::provider::{GITHUB_ACCEPT, JSON_CONTENT_TYPE};
use crate::auth::SessionStore;
use crate::config::{Config, USER_AGENT};
use crate::error::{Error, Result};
use crate::models::{PackageManifest, User};

/// Registry client. Clone is cheap - reqwest::Client and SessionStore are
/// both shared handles.
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    store: SessionStore,
    user_url: String,
    publish_url: String,
}

impl RegistryClient {
    /// Build the HTTP client shared by the registry client and the identity provider
    pub fn http_client(config: &Config) -> Result<Client> {
        Ok(Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?)
    }

    pub fn new(client: Client, config: &Config, store: SessionStore) -> Self {
        Self {
            client,
            store,
            user_url: config.user_url().to_string(),
            publish_url: config.publish_url().to_string(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    async fn require_token(&self) -> Result<String> {
        self.store.token().await.ok_or(Error::NotAuthenticated)
    }

    /// Return the login handle of the authenticated user.
    pub async fn whoami(&self) -> Result<String> {
        let token = self.require_token().await?;

        let response = self
            .client
            .get(&self.user_url)
            .header(header::AUTHORIZATION, format!("token {}", token))
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, &body));
        }

        let user: User = response.json().await?;
        debug!(login = %user.login, "Resolved current user");
        Ok(user.login)
    }

    /// Upload a package manifest. Only a 200 response counts as published.
    pub async fn publish(&self, manifest: &PackageManifest) -> Result<()> {
        let token = self.require_token().await?;
        let body = serde_json::to_vec(manifest)?;

        let response = self
            .client
            .post(&self.publish_url)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::AUTHORIZATION, token)
            .body(body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                info!(name = ?manifest.name(), version = ?manifest.version(), "Package published");
                Ok(())
            }
            status => Err(Error::PublishFailed {
                status: status.as_u16(),
            }),
        }
    }

    /// Clear the stored token. The write is queued, not awaited; call
    /// [`SessionStore::drain`] before exiting to make it durable.
    pub async fn logout(&self) -> Result<()> {
        if !self.store.is_authenticated().await {
            return Err(Error::NotAuthenticated);
        }
        self.store.clear_token().await;
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        path: PathBuf,
        client: RegistryClient,
    }

    async fn fixture(server: &MockServer, session: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".aspkgrc");
        std::fs::write(&path, session).unwrap();

        let config = Config {
            user_url: Some(server.url("/user")),
            publish_url: Some(server.url("/api-publish")),
            ..Default::default()
        };
        let store = SessionStore::open(&path).await;
        let client = RegistryClient::new(RegistryClient::http_client(&config).unwrap(), &config, store);
        Fixture {
            _dir: dir,
            path,
            client,
        }
    }

    fn manifest() -> PackageManifest {
        PackageManifest::parse(r#"{"name":"as-json","version":"1.0.0"}"#).unwrap()
    }

    #[tokio::test]
    async fn test_publish_sends_raw_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api-publish")
                    .header("authorization", "gho_secret")
                    .header("content-type", JSON_CONTENT_TYPE)
                    .header("user-agent", USER_AGENT)
                    .json_body(json!({ "name": "as-json", "version": "1.0.0" }));
                then.status(200);
            })
            .await;
        let fx = fixture(&server, r#"{"accessToken":"gho_secret"}"#).await;

        fx.client.publish(&manifest()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_failure_carries_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api-publish");
                then.status(404);
            })
            .await;
        let fx = fixture(&server, r#"{"accessToken":"gho_secret"}"#).await;

        let err = fx.client.publish(&manifest()).await.unwrap_err();
        assert!(matches!(err, Error::PublishFailed { status: 404 }));

        assert_eq!(fx.client.store().token().await.as_deref(), Some("gho_secret"));
        fx.client.store().drain().await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&fx.path).unwrap(),
            r#"{"accessToken":"gho_secret"}"#
        );
    }

    #[tokio::test]
    async fn test_non_200_success_is_still_a_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api-publish");
                then.status(201);
            })
            .await;
        let fx = fixture(&server, r#"{"accessToken":"gho_secret"}"#).await;

        let err = fx.client.publish(&manifest()).await.unwrap_err();
        assert!(matches!(err, Error::PublishFailed { status: 201 }));
    }

    #[tokio::test]
    async fn test_publish_requires_session() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api-publish");
                then.status(200);
            })
            .await;
        let fx = fixture(&server, "{}").await;

        let err = fx.client.publish(&manifest()).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_whoami() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/user")
                    .header("authorization", "token gho_secret")
                    .header("accept", GITHUB_ACCEPT)
                    .header("user-agent", USER_AGENT);
                then.status(200)
                    .json_body(json!({ "login": "octocat", "id": 1, "type": "User" }));
            })
            .await;
        let fx = fixture(&server, r#"{"accessToken":"gho_secret"}"#).await;

        assert_eq!(fx.client.whoami().await.unwrap(), "octocat");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_whoami_revoked_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/user");
                then.status(401).json_body(json!({ "message": "Bad credentials" }));
            })
            .await;
        let fx = fixture(&server, r#"{"accessToken":"gho_revoked"}"#).await;

        assert!(matches!(fx.client.whoami().await, Err(Error::Unauthorized)));
    }

    #[tokio::test]
    async fn test_whoami_requires_session() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server, "{}").await;

        assert!(matches!(fx.client.whoami().await, Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server, r#"{"accessToken":"gho_secret"}"#).await;

        fx.client.logout().await.unwrap();
        assert!(!fx.client.store().is_authenticated().await);

        fx.client.store().drain().await.unwrap();
        assert_eq!(std::fs::read_to_string(&fx.path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_leaves_file_alone() {
        let server = MockServer::start_async().await;
        let fx = fixture(&server, "{ }").await;

        let err = fx.client.logout().await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));

        fx.client.store().drain().await.unwrap();
        assert_eq!(std::fs::read_to_string(&fx.path).unwrap(), "{ }");
    }
}
