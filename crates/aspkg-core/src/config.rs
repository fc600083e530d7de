//! Client configuration management.
//!
//! This module holds the identity provider and registry endpoints, the OAuth
//! client identifier, and the location of the session file.
//!
//! Configuration is read from `~/.config/aspkg/config.json` when present and
//! can be overridden field by field with `ASPKG_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Application name used for config directory paths
const APP_NAME: &str = "aspkg";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session file name in the user's home directory
const SESSION_FILE: &str = ".aspkgrc";

const DEFAULT_CLIENT_ID: &str = "Iv1.8a61f9b3a7aba766";
const DEFAULT_SCOPE: &str = "read:user";
const DEFAULT_DEVICE_CODE_URL: &str = "https://github.com/login/device/code";
const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEFAULT_USER_URL: &str = "https://api.github.com/user";
const DEFAULT_PUBLISH_URL: &str = "http://localhost:3000/api-publish";
const DEFAULT_PACKAGE_URL: &str = "https://aspkg.dev/package";

/// Sent on every request; the GitHub API rejects requests without one.
pub const USER_AGENT: &str = "aspkg-cli";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub client_id: Option<String>,
    pub scope: Option<String>,
    pub device_code_url: Option<String>,
    pub token_url: Option<String>,
    pub user_url: Option<String>,
    pub publish_url: Option<String>,
    pub package_url: Option<String>,
    pub session_file: Option<PathBuf>,
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Override fields from environment variables, looked up through `lookup`.
    ///
    /// Empty values are ignored, except `ASPKG_SCOPE` where an empty value
    /// disables the scope.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |field: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = Some(value);
            }
        };
        set(&mut self.client_id, "ASPKG_CLIENT_ID");
        set(&mut self.device_code_url, "ASPKG_DEVICE_CODE_URL");
        set(&mut self.token_url, "ASPKG_TOKEN_URL");
        set(&mut self.user_url, "ASPKG_USER_URL");
        set(&mut self.publish_url, "ASPKG_PUBLISH_URL");
        set(&mut self.package_url, "ASPKG_PACKAGE_URL");

        if let Some(scope) = lookup("ASPKG_SCOPE") {
            self.scope = Some(scope);
        }

        if let Some(path) = lookup("ASPKG_SESSION_FILE").filter(|v| !v.is_empty()) {
            self.session_file = Some(PathBuf::from(path));
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID)
    }

    /// The requested permission scope. An empty string means no scope is sent.
    pub fn scope(&self) -> Option<&str> {
        match self.scope.as_deref() {
            Some("") => None,
            Some(scope) => Some(scope),
            None => Some(DEFAULT_SCOPE),
        }
    }

    pub fn device_code_url(&self) -> &str {
        self.device_code_url.as_deref().unwrap_or(DEFAULT_DEVICE_CODE_URL)
    }

    pub fn token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    pub fn user_url(&self) -> &str {
        self.user_url.as_deref().unwrap_or(DEFAULT_USER_URL)
    }

    pub fn publish_url(&self) -> &str {
        self.publish_url.as_deref().unwrap_or(DEFAULT_PUBLISH_URL)
    }

    /// Public page of a published package
    pub fn package_page(&self, name: &str) -> String {
        let base = self.package_url.as_deref().unwrap_or(DEFAULT_PACKAGE_URL);
        format!("{}/{}", base.trim_end_matches('/'), name)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    /// Location of the session file, `~/.aspkgrc` unless overridden.
    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.session_file {
            return Ok(path.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not find home directory".to_string()))?;
        Ok(home.join(SESSION_FILE))
    }
}
