use thiserror::Error;

use crate::retry::RetryAction;
use crate::source::SourceError;

/// Typed download errors enabling retry classification.
///
/// `retry_action()` separates transient source failures from stale sessions
/// and from permanent ones (missing content, local disk errors) so the retry
/// loop can abort early.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("No content available for {path}")]
    NoContent { path: String },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),
}

impl DownloadError {
    pub fn retry_action(&self) -> RetryAction {
        match self {
            DownloadError::Source(e) => e.retry_action(),
            DownloadError::NoContent { .. } => RetryAction::Abort,
            DownloadError::Disk(_) => RetryAction::Abort,
        }
    }
}
