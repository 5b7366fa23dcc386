//! Session-wide request spacing.
//!
//! One limiter is shared by every outbound path of a session. It is not
//! keyed: a news search and an insight request draw from the same gate.

use crate::clock::{Clock, SystemClock};
use crate::types::{PulseError, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(5000);

#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    min_interval: Duration,
    // None until the first accepted request, so that request always passes.
    last_request: Mutex<Option<Instant>>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_MIN_INTERVAL, SystemClock)
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, SystemClock)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns `true` and records the current time when at least
    /// `min_interval` has passed since the last accepted request.
    /// A rejected call leaves the state untouched.
    pub fn can_request(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last_request.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = *last {
            if now.saturating_duration_since(previous) < self.min_interval {
                debug!("Request rejected by rate limiter");
                return false;
            }
        }

        *last = Some(now);
        true
    }

    /// Whole seconds, rounded up, until the next request would be accepted.
    pub fn time_remaining(&self) -> u64 {
        let now = self.clock.now();
        let last = *self.last_request.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(previous) = last else {
            return 0;
        };

        let remaining = self.min_interval.saturating_sub(now.saturating_duration_since(previous));
        remaining.as_nanos().div_ceil(1_000_000_000) as u64
    }

    /// [`can_request`](Self::can_request) as a `Result`, for call sites that
    /// propagate with `?`.
    pub fn check(&self) -> Result<()> {
        if self.can_request() {
            Ok(())
        } else {
            Err(PulseError::RateLimited {
                seconds: self.time_remaining(),
            })
        }
    }
}
