use serde::{Deserialize, Serialize};

/// `grant_type` for exchanging a device code (RFC 8628)
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceCodeRequest<'a> {
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<&'a str>,
}

/// Poll interval to use when the provider does not send one (RFC 8628 §3.2)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// A device authorization grant issued by the identity provider.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until the grant is void
    pub expires_in: u64,
    /// Minimum seconds between polls
    #[serde(default = "default_interval")]
    pub interval: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub device_code: &'a str,
    pub grant_type: &'static str,
}

impl<'a> TokenRequest<'a> {
    pub fn new(client_id: &'a str, device_code: &'a str) -> Self {
        Self {
            client_id,
            device_code,
            grant_type: DEVICE_CODE_GRANT_TYPE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Body of a token poll response. Providers answer with either a token or
/// an `error` code, often with a 200 status in both cases.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PollResponse {
    Token(TokenGrant),
    Error {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

impl PollResponse {
    pub fn pending() -> Self {
        Self::error("authorization_pending")
    }

    pub fn error(code: &str) -> Self {
        PollResponse::Error {
            error: code.to_string(),
            error_description: None,
        }
    }

    pub fn token(access_token: &str) -> Self {
        PollResponse::Token(TokenGrant {
            access_token: access_token.to_string(),
            token_type: Some("bearer".to_string()),
            scope: None,
        })
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct User {
    pub login: String,
}
