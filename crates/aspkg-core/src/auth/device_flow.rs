//! OAuth device authorization flow (RFC 8628).
//!
//! The flow is a small state machine:
//!
//! ```text
//! Idle -> CodeRequested -> Polling -> Authorized | Denied | Expired | Failed
//! ```
//!
//! `Polling` loops on itself while the user has not finished authorizing.
//! Each poll waits the provider's interval first, so the first token request
//! happens one full interval after the code was issued.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::provider::IdentityProvider;
use crate::auth::session::SessionStore;
use crate::config::Config;
use crate::error::{Error, PollErrorKind, Result};
use crate::models::{DeviceAuthorization, PollResponse, TokenGrant};

/// Added to the poll interval each time the provider answers `slow_down`.
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Floor for the poll interval, whatever the provider asks for.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polling state for one grant.
#[derive(Debug)]
pub struct PollSchedule {
    grant: DeviceAuthorization,
    interval: Duration,
    /// `None` when `expires_in` is too large to represent
    deadline: Option<Instant>,
    attempts: u32,
}

impl PollSchedule {
    fn new(grant: DeviceAuthorization, issued_at: Instant) -> Self {
        Self {
            interval: Duration::from_secs(grant.interval).max(MIN_POLL_INTERVAL),
            deadline: issued_at.checked_add(Duration::from_secs(grant.expires_in)),
            grant,
            attempts: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[derive(Debug)]
pub enum FlowState {
    Idle,
    CodeRequested {
        grant: DeviceAuthorization,
        issued_at: Instant,
    },
    Polling(PollSchedule),
    Authorized(TokenGrant),
    Denied,
    Expired,
    Failed(Error),
}

/// Drives a device-flow login against an [`IdentityProvider`].
pub struct DeviceFlow<P> {
    provider: P,
    client_id: String,
    scope: Option<String>,
}

impl<P: IdentityProvider> DeviceFlow<P> {
    pub fn new(provider: P, client_id: impl Into<String>, scope: Option<String>) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
            scope,
        }
    }

    pub fn from_config(provider: P, config: &Config) -> Self {
        Self::new(provider, config.client_id(), config.scope().map(str::to_string))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Log in and store the resulting token in `store`.
    ///
    /// `present` is called once with the user code and verification URL as
    /// soon as the provider issues them. Cancelling `cancel` stops the flow
    /// at the next wait or in-flight poll.
    pub async fn login<F>(
        &self,
        store: &SessionStore,
        mut present: F,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        F: FnMut(&str, &str),
    {
        if store.is_authenticated().await {
            return Err(Error::AlreadyAuthenticated);
        }

        let mut state = FlowState::Idle;
        let grant = loop {
            state = match self.step(state, &mut present, cancel).await {
                FlowState::Authorized(grant) => break grant,
                FlowState::Denied => return Err(Error::AccessDenied),
                FlowState::Expired => return Err(Error::ExpiredCode),
                FlowState::Failed(e) => return Err(e),
                next => next,
            };
        };

        store.set_token(grant.access_token).await;
        info!("Device flow authorized");
        Ok(())
    }

    /// Advance the state machine by one transition.
    pub async fn step<F>(
        &self,
        state: FlowState,
        present: &mut F,
        cancel: &CancellationToken,
    ) -> FlowState
    where
        F: FnMut(&str, &str),
    {
        match state {
            FlowState::Idle => {
                match self
                    .provider
                    .request_device_code(&self.client_id, self.scope.as_deref())
                    .await
                {
                    Ok(grant) => {
                        debug!(
                            expires_in = grant.expires_in,
                            interval = grant.interval,
                            "Device code issued"
                        );
                        FlowState::CodeRequested {
                            grant,
                            issued_at: Instant::now(),
                        }
                    }
                    Err(e) => FlowState::Failed(e),
                }
            }
            FlowState::CodeRequested { grant, issued_at } => {
                present(&grant.user_code, &grant.verification_uri);
                FlowState::Polling(PollSchedule::new(grant, issued_at))
            }
            FlowState::Polling(schedule) => self.poll(schedule, cancel).await,
            terminal => terminal,
        }
    }

    async fn poll(&self, mut schedule: PollSchedule, cancel: &CancellationToken) -> FlowState {
        let past_deadline = match (Instant::now().checked_add(schedule.interval), schedule.deadline) {
            (Some(next_poll), Some(deadline)) => next_poll > deadline,
            (Some(_), None) => false,
            (None, _) => true,
        };
        if past_deadline {
            warn!(attempts = schedule.attempts, "Device code expired before the next poll");
            return FlowState::Expired;
        }

        let attempt = async {
            sleep(schedule.interval).await;
            self.provider
                .poll_token(&self.client_id, &schedule.grant.device_code)
                .await
        };
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FlowState::Failed(Error::Cancelled),
            response = attempt => response,
        };
        schedule.attempts += 1;

        let error = match response {
            Ok(PollResponse::Token(grant)) => return FlowState::Authorized(grant),
            Ok(PollResponse::Error { error, .. }) => error,
            Err(e) => return FlowState::Failed(e),
        };

        match Error::from_poll_error(&error) {
            PollErrorKind::Pending => {
                debug!(code = %error, attempts = schedule.attempts, "Authorization pending");
                FlowState::Polling(schedule)
            }
            PollErrorKind::SlowDown => {
                schedule.interval = schedule.interval.saturating_add(SLOW_DOWN_INCREMENT);
                warn!(interval_secs = schedule.interval.as_secs(), "Provider asked to slow down");
                FlowState::Polling(schedule)
            }
            PollErrorKind::Terminal(Error::ExpiredCode) => FlowState::Expired,
            PollErrorKind::Terminal(Error::AccessDenied) => FlowState::Denied,
            PollErrorKind::Terminal(e) => FlowState::Failed(e),
        }
    }
}
