//! Retry with backoff for remote calls.
//!
//! - **Transient errors** (timeout, connection failure, HTTP 408/429/5xx) are
//!   retried until the policy's attempt budget is spent.
//! - **Permanent errors** (auth failure, other 4xx, malformed response) fail
//!   immediately and consume no further attempts.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{BackoffKind, RetryConfig};
use crate::errors::RemoteServiceError;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the `failed_attempts`-th failure (1-based).
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let exponent = failed_attempts.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exponent).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base, max },
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        let base = Duration::from_millis(config.base_delay_ms);
        match config.backoff {
            BackoffKind::Fixed => RetryPolicy::fixed(config.max_attempts, base),
            BackoffKind::Exponential => RetryPolicy::exponential(
                config.max_attempts,
                base,
                Duration::from_millis(config.max_delay_ms.max(config.base_delay_ms)),
            ),
        }
    }
}

/// Failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    Transient(String),
    Permanent(String),
}

impl CallError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transient(_))
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Transient(msg) => write!(f, "transient: {}", msg),
            CallError::Permanent(msg) => write!(f, "permanent: {}", msg),
        }
    }
}

impl std::error::Error for CallError {}

/// A successful result together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or the budget runs out.
pub async fn call_with_retry<T, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<Attempted<T>, RemoteServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}/{}", operation, attempt, max_attempts);
                }
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                });
            }
            Err(CallError::Permanent(cause)) => {
                warn!("{} failed permanently on attempt {}: {}", operation, attempt, cause);
                return Err(RemoteServiceError {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last_cause: cause,
                    transient: false,
                });
            }
            Err(CallError::Transient(cause)) => {
                if attempt >= max_attempts {
                    warn!(
                        "{} exhausted {} attempts, last error: {}",
                        operation, max_attempts, cause
                    );
                    return Err(RemoteServiceError {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last_cause: cause,
                        transient: true,
                    });
                }

                let delay = policy.backoff.delay_for(attempt);
                warn!(
                    "{} attempt {}/{} failed ({}), retrying in {:?}",
                    operation, attempt, max_attempts, cause, delay
                );
                sleep(delay).await;
            }
        }
    }
}
