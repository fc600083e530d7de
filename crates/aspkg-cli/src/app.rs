//! Command handlers.
//!
//! `App` owns the session store and the clients built from the config, runs
//! one command, and drains pending session writes before the process exits.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use aspkg_core::{
    Config, DeviceFlow, Error, HttpIdentityProvider, PackageManifest, RegistryClient, SessionStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::Command;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The command succeeded, or there was nothing to do
    Success,
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

pub struct App {
    config: Config,
    store: SessionStore,
    registry: RegistryClient,
    flow: DeviceFlow<HttpIdentityProvider>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let session_path = config
            .session_path()
            .context("Failed to locate the session file")?;
        debug!(?session_path, "Opening session");
        let store = SessionStore::open(session_path).await;

        let http = RegistryClient::http_client(&config).context("Failed to build HTTP client")?;
        let provider = HttpIdentityProvider::new(http.clone(), &config);
        let flow = DeviceFlow::from_config(provider, &config);
        let registry = RegistryClient::new(http, &config, store.clone());

        Ok(Self {
            config,
            store,
            registry,
            flow,
        })
    }

    /// Run one command and render its outcome.
    pub async fn run(&self, command: Command) -> Outcome {
        let result = match command {
            Command::Login => self.login().await,
            Command::Logout => self.logout().await,
            Command::Whoami => self.whoami().await,
            Command::Publish { new_version, dir } => self.publish(new_version, dir).await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                ui::failure(&e);
                Outcome::Failure
            }
        }
    }

    /// Wait for queued session writes so none are lost on exit.
    pub async fn shutdown(&self) {
        if let Err(e) = self.store.drain().await {
            ui::warning(&format!("{} - the session file may be out of date", e));
        }
    }

    async fn login(&self) -> Result<Outcome> {
        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        let result = self.flow.login(&self.store, ui::present_code, &cancel).await;
        watcher.abort();

        match result {
            Ok(()) => {
                ui::success("You're now logged in!");
                Ok(Outcome::Success)
            }
            Err(Error::AlreadyAuthenticated) => {
                ui::already_authenticated();
                Ok(Outcome::Success)
            }
            Err(e) => Err(e).context("Login failed"),
        }
    }

    async fn logout(&self) -> Result<Outcome> {
        match self.registry.logout().await {
            Ok(()) => {
                ui::success("Successfully logged out.");
                Ok(Outcome::Success)
            }
            Err(Error::NotAuthenticated) => {
                ui::already_logged_out();
                Ok(Outcome::Success)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn whoami(&self) -> Result<Outcome> {
        match self.registry.whoami().await {
            Ok(login) => {
                println!("{}", login);
                Ok(Outcome::Success)
            }
            Err(Error::NotAuthenticated) => {
                ui::not_logged_in();
                Ok(Outcome::Success)
            }
            Err(e) => Err(e).context("Could not look up the current user"),
        }
    }

    async fn publish(&self, new_version: Option<String>, dir: Option<PathBuf>) -> Result<Outcome> {
        // Check before prompting so a logged-out user is not asked for a version
        if !self.store.is_authenticated().await {
            ui::not_logged_in();
            return Ok(Outcome::Success);
        }

        let dir = match dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };
        let mut manifest = PackageManifest::load(&dir)
            .with_context(|| format!("Failed to read package.json in {}", dir.display()))?;

        let current = manifest.version().unwrap_or("none").to_string();
        println!("Current version: {}", current);

        let answer = match new_version {
            Some(version) => version,
            None => ask(ui::prompt_version).await?,
        };
        match parse_version(&answer) {
            VersionInput::Keep => {}
            VersionInput::New(version) => manifest.set_version(&version),
            VersionInput::Invalid => {
                ui::warning("Invalid version.");
                return Ok(Outcome::Failure);
            }
        }

        let name = manifest
            .name()
            .context("package.json has no \"name\" field")?
            .to_string();
        let version = manifest.version().unwrap_or("none").to_string();

        println!("Uploading...");
        match self.registry.publish(&manifest).await {
            Ok(()) => {
                info!(%name, %version, "Published");
                ui::published(&name, &version, &self.config.package_page(&name));
                Ok(Outcome::Success)
            }
            Err(Error::NotAuthenticated) => {
                ui::not_logged_in();
                Ok(Outcome::Success)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Run a blocking terminal prompt off the async runtime.
async fn ask<F>(prompt: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(prompt)
        .await
        .context("Prompt did not complete")?
}

#[derive(Debug, PartialEq)]
enum VersionInput {
    Keep,
    New(String),
    Invalid,
}

/// Interpret the version answer: empty keeps the manifest's version,
/// anything else must be a full semver version.
fn parse_version(input: &str) -> VersionInput {
    let input = input.trim();
    if input.is_empty() {
        return VersionInput::Keep;
    }
    match semver::Version::parse(input) {
        Ok(version) => VersionInput::New(version.to_string()),
        Err(_) => VersionInput::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(""), VersionInput::Keep);
        assert_eq!(parse_version("  "), VersionInput::Keep);
        assert_eq!(parse_version("1.2.3"), VersionInput::New("1.2.3".to_string()));
        assert_eq!(
            parse_version(" 2.0.0-beta.1 "),
            VersionInput::New("2.0.0-beta.1".to_string())
        );
        assert_eq!(parse_version("1.2"), VersionInput::Invalid);
        assert_eq!(parse_version("v1.2.3"), VersionInput::Invalid);
    }

    #[tokio::test]
    async fn test_prompt_does_not_block_the_runtime() {
        // The answer comes from a task on the same single-threaded runtime
        let (tx, rx) = std::sync::mpsc::channel();
        tokio::spawn(async move {
            tx.send("1.2.3".to_string()).unwrap();
        });

        let answer = ask(move || Ok(rx.recv()?)).await.unwrap();
        assert_eq!(answer, "1.2.3");
    }

    #[tokio::test]
    async fn test_logged_out_publish_exits_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            session_file: Some(dir.path().join(".aspkgrc")),
            ..Default::default()
        };

        let app = App::new(config).await.unwrap();
        let code = app
            .run(Command::Publish {
                new_version: Some("1.0.0".to_string()),
                dir: Some(dir.path().to_path_buf()),
            })
            .await;
        app.shutdown().await;

        assert_eq!(code, Outcome::Success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".aspkgrc")).unwrap(),
            "{}"
        );
    }

    #[tokio::test]
    async fn test_logout_when_logged_out_exits_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            session_file: Some(dir.path().join(".aspkgrc")),
            ..Default::default()
        };

        let app = App::new(config).await.unwrap();
        assert_eq!(app.run(Command::Logout).await, Outcome::Success);
        app.shutdown().await;
    }
}
