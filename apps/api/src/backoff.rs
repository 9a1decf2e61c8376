//! Backoff Executor — retries a fallible async operation with exponential delay
//! plus random jitter, bounded by an attempt cap and interruptible by a
//! [`CancelToken`].
//!
//! Delay after failed attempt `i` (0-based): `base_delay * 2^i + U[0, max_jitter)`.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Marker returned by the executor when a run is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Retry policy. Defaults: 3 attempts, 1s base delay, up to 1s of jitter.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl BackoffPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt `attempt` (0-based).
    /// Jitter is drawn fresh on every call.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

/// Outcome of a single attempt, kept only for logging.
struct RequestAttempt {
    index: u32,
    delay: Option<Duration>,
    outcome: AttemptOutcome,
}

enum AttemptOutcome {
    Succeeded,
    Failed(String),
}

impl Display for RequestAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Succeeded => write!(f, "attempt {} succeeded", self.index + 1),
            AttemptOutcome::Failed(reason) => write!(f, "attempt {} failed: {reason}", self.index + 1),
        }?;
        if let Some(delay) = self.delay {
            write!(f, " (next in {}ms)", delay.as_millis())?;
        }
        Ok(())
    }
}

/// Cloneable cancellation signal. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone of this token.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt cap is reached. The last error is returned unchanged.
///
/// `max_attempts` of 0 or 1 still runs `op` once. Cancellation is honored
/// before each attempt, while an attempt is in flight, and during the delay.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + From<Cancelled> + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            outcome = op() => outcome,
        };

        match outcome {
            Ok(value) => {
                debug!(
                    "{}",
                    RequestAttempt {
                        index: attempt,
                        delay: None,
                        outcome: AttemptOutcome::Succeeded,
                    }
                );
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    "Retrying ({}/{}): {}",
                    attempt + 2,
                    max_attempts,
                    RequestAttempt {
                        index: attempt,
                        delay: Some(delay),
                        outcome: AttemptOutcome::Failed(e.to_string()),
                    }
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Cancelled.into()),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            Err(e) => {
                debug!(
                    "Giving up after attempt {}/{}: {}",
                    attempt + 1,
                    max_attempts,
                    e
                );
                return Err(e);
            }
        }
    }
}
