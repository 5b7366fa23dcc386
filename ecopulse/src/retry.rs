//! Bounded exponential-backoff retry for remote calls.
//!
//! Only transient failures are retried. A failure is transient when it
//! carries no status code, or a server-side one (>= 500). Client errors
//! (< 500) go straight back to the caller. The error returned after the
//! last attempt is the operation's own error, never a wrapper.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

// Upper bound on a single wait; unreachable with the default budget.
const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Failure classification used by [`with_retry`].
pub trait RemoteFailure {
    /// HTTP-style status of the failure, if the failure has one.
    fn status(&self) -> Option<u16>;

    fn is_transient(&self) -> bool {
        match self.status() {
            // A zero status counts as "no status".
            Some(status) if status != 0 => status >= 500,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Wait before the first retry; doubled before each further retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, initial_delay: Duration) -> Self {
        Self { retries, initial_delay }
    }

    /// Single attempt, failures propagate immediately.
    pub fn none() -> Self {
        Self::new(0, DEFAULT_INITIAL_DELAY)
    }

    /// The waits this policy would perform if every attempt failed
    /// transiently.
    pub fn delays(&self) -> Vec<Duration> {
        let mut schedule = self.schedule();
        (0..self.retries).filter_map(|_| schedule.next_backoff()).collect()
    }

    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RemoteFailure + Display,
    {
        with_retry(self, operation).await
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: MAX_DELAY,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run `operation`, retrying transient failures according to `policy`.
///
/// The wait is a tokio timer, so other tasks keep running while this call
/// backs off. There is no cancellation: dropping interest in the result
/// does not stop an already started loop unless the future itself is
/// dropped.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RemoteFailure + Display,
{
    let mut schedule = policy.schedule();
    let mut retries_remaining = policy.retries;
    let mut attempt: u32 = 1;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_transient() {
            debug!("Attempt {} failed with non-transient error: {}", attempt, error);
            return Err(error);
        }

        if retries_remaining == 0 {
            if attempt > 1 {
                warn!("Giving up after {} attempts: {}", attempt, error);
            }
            return Err(error);
        }

        let Some(delay) = schedule.next_backoff() else {
            return Err(error);
        };

        warn!("Attempt {} failed: {}, retrying in {:?}", attempt, error, delay);
        tokio::time::sleep(delay).await;

        retries_remaining -= 1;
        attempt += 1;
    }
}
