use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Attempt to call `login` when user is already authenticated.")]
    AlreadyAuthenticated,

    #[error("This command requires an authenticated session.")]
    NotAuthenticated,

    #[error("Code has expired. Please use `aspkg login` again for a new code.")]
    ExpiredCode,

    #[error("Log in was unsuccessful.")]
    AccessDenied,

    #[error("The identity provider no longer supports the device code grant. This client is outdated.")]
    UnsupportedGrantType,

    #[error("The identity provider rejected the client credentials. Please contact the developers of aspkg.")]
    IncorrectClientCredentials,

    #[error("Could not publish package. Status code {status}")]
    PublishFailed { status: u16 },

    #[error("Failed to persist the session ({failures} write(s) failed)")]
    PersistenceFailed { failures: usize },

    #[error("Login cancelled")]
    Cancelled,

    #[error("Unauthorized - token may be revoked")]
    Unauthorized,

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Unexpected response status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// What a device-flow poll error code means for the poll loop.
#[derive(Debug)]
pub enum PollErrorKind {
    /// Keep polling at the current interval.
    Pending,
    /// Keep polling, but back off first.
    SlowDown,
    /// Stop polling and fail the flow.
    Terminal(Error),
}

impl Error {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => Error::Unauthorized,
            429 => Error::RateLimited,
            code => Error::Http {
                status: code,
                body: Self::truncate_body(body),
            },
        }
    }

    /// Map an OAuth device-flow `error` code to its effect on polling.
    /// Codes not listed here are treated as transient.
    pub fn from_poll_error(code: &str) -> PollErrorKind {
        match code {
            "slow_down" => PollErrorKind::SlowDown,
            "expired_token" => PollErrorKind::Terminal(Error::ExpiredCode),
            "access_denied" => PollErrorKind::Terminal(Error::AccessDenied),
            "unsupported_grant_type" => PollErrorKind::Terminal(Error::UnsupportedGrantType),
            "incorrect_client_credentials" => {
                PollErrorKind::Terminal(Error::IncorrectClientCredentials)
            }
            _ => PollErrorKind::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_poll_error() {
        assert!(matches!(Error::from_poll_error("authorization_pending"), PollErrorKind::Pending));
        assert!(matches!(Error::from_poll_error("something_new"), PollErrorKind::Pending));
        assert!(matches!(Error::from_poll_error("slow_down"), PollErrorKind::SlowDown));
        assert!(matches!(
            Error::from_poll_error("expired_token"),
            PollErrorKind::Terminal(Error::ExpiredCode)
        ));
        assert!(matches!(
            Error::from_poll_error("access_denied"),
            PollErrorKind::Terminal(Error::AccessDenied)
        ));
        assert!(matches!(
            Error::from_poll_error("unsupported_grant_type"),
            PollErrorKind::Terminal(Error::UnsupportedGrantType)
        ));
        assert!(matches!(
            Error::from_poll_error("incorrect_client_credentials"),
            PollErrorKind::Terminal(Error::IncorrectClientCredentials)
        ));
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            Error::from_status(reqwest::StatusCode::UNAUTHORIZED, ""),
            Error::Unauthorized
        ));
        assert!(matches!(
            Error::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            Error::RateLimited
        ));

        let long_body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        match Error::from_status(reqwest::StatusCode::BAD_GATEWAY, &long_body) {
            Error::Http { status, body } => {
                assert_eq!(status, 502);
                assert!(body.contains("truncated"));
                assert!(body.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
