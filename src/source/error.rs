use thiserror::Error;

use crate::retry::RetryAction;

/// Errors raised by a remote asset source.
///
/// The download layer never inspects variants directly; it asks
/// [`SourceError::is_transient`] and [`SourceError::is_session_expired`] so
/// that any source implementation can plug into the same retry policy.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Login failed: {0}")]
    FailedLogin(String),

    #[error("HTTP error {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Network-level failures plus throttling and 5xx responses. Worth
    /// another attempt after a pause.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Connection(_) => true,
            SourceError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            SourceError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
            }
            SourceError::SessionExpired(_)
            | SourceError::FailedLogin(_)
            | SourceError::MalformedRecord(_)
            | SourceError::Json(_) => false,
        }
    }

    /// The service no longer accepts our session token; a fresh login is
    /// needed before further calls can succeed.
    pub fn is_session_expired(&self) -> bool {
        match self {
            SourceError::SessionExpired(_) => true,
            SourceError::HttpStatus { status, .. } => *status == 401 || *status == 421,
            _ => false,
        }
    }

    /// The service refused our credentials outright. Logging in again
    /// cannot help until the user fixes them.
    pub fn is_credential_rejected(&self) -> bool {
        matches!(self, SourceError::FailedLogin(_))
    }

    /// How a retry loop should react to this error.
    pub fn retry_action(&self) -> RetryAction {
        if self.is_session_expired() {
            RetryAction::Reauthenticate
        } else if self.is_transient() {
            RetryAction::Retry
        } else {
            RetryAction::Abort
        }
    }
}
