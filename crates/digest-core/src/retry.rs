use std::time::{Duration, Instant};
use tracing::warn;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;

    /// Server-requested wait before the next attempt (e.g. `Retry-After`)
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Wall-clock ceiling for a whole run
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Time left, or `None` once the deadline has passed
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_none()
    }

    /// `timeout` shortened to the time left, or `None` once expired
    pub fn cap(&self, timeout: Duration) -> Option<Duration> {
        self.remaining().map(|left| left.min(timeout))
    }
}

/// Bounded exponential backoff shared by the tracker and the chat sink
///
/// Each call site owns its own instance, so budgets are independent.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Growth factor applied per further attempt
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let secs = self.base_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Run `op` until it succeeds, fails permanently, the attempt budget is spent,
    /// or waiting for the next attempt would overrun `deadline`.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned as is.
    pub fn execute<T, E, F>(&self, label: &str, deadline: &Deadline, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let delay = err
                .retry_after()
                .unwrap_or_else(|| self.delay_for(attempt))
                .min(self.max_delay);

            match deadline.remaining() {
                Some(left) if left > delay => {}
                _ => {
                    warn!(
                        target: "digest::retry",
                        call = label,
                        attempt,
                        error = %err,
                        "Run deadline leaves no room for another attempt"
                    );
                    return Err(err);
                }
            }

            warn!(
                target: "digest::retry",
                call = label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transient failure"
            );
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            attempt += 1;
        }
    }
}
