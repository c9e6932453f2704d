use std::future::Future;
use std::time::Duration;

/// Default bound on attempts per download, the first one included.
pub const MAX_ATTEMPTS: u32 = 5;

/// Default pause between attempts.
pub const WAIT_SECONDS: u64 = 5;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    /// Log in again before the next attempt.
    Reauthenticate,
    Abort,
}

/// Fixed-interval retry policy. Every failed attempt except the last is
/// followed by the same pause; there is no exponential growth.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay_secs: WAIT_SECONDS,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The classifier judged the error permanent.
    Aborted(E),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    /// The error from the final attempt, whichever way the loop ended.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Aborted(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Aborted(e) => write!(f, "{}", e),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {} attempts: {}", attempts, last)
            }
        }
    }
}

/// Retry an async operation with a fixed pause between attempts.
///
/// - `config`: attempt bound and pause
/// - `classifier`: inspects an error and returns `Retry`, `Reauthenticate` or `Abort`
/// - `reauthenticate`: called before the next attempt after a `Reauthenticate`
///   verdict; stays pending until it succeeds, and a failed call uses up the
///   attempt it preceded
/// - `operation`: the async closure to retry
pub async fn retry_with_backoff<F, Fut, R, RFut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    reauthenticate: R,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn() -> RFut,
    RFut: Future<Output = Result<(), E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_attempts.max(1);
    let mut reauth_pending = false;
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = if reauth_pending {
            match reauthenticate().await {
                Ok(()) => {
                    reauth_pending = false;
                    operation().await
                }
                Err(e) => Err(e),
            }
        } else {
            operation().await
        };

        let e = match result {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };

        let action = classifier(&e);
        if action == RetryAction::Abort {
            return Err(RetryError::Aborted(e));
        }
        if attempt >= total_attempts {
            return Err(RetryError::Exhausted {
                attempts: total_attempts,
                last: e,
            });
        }
        if action == RetryAction::Reauthenticate {
            reauth_pending = true;
        }

        let delay = config.delay();
        tracing::warn!(
            "Retryable error (attempt {}/{}), retrying in {}s: {}",
            attempt,
            total_attempts,
            delay.as_secs(),
            e
        );
        tokio::time::sleep(delay).await;
    }
}
