//! Bounded retry with a fixed delay between attempts.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Rejected retry settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryConfigError {
    /// At least one attempt is required.
    #[error("retry attempts must be at least 1")]
    ZeroAttempts,
    /// The pause between attempts must be positive.
    #[error("retry delay must be greater than zero")]
    NonPositiveDelay,
}

/// All attempts failed. Carries the error of the final attempt.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryError<E: fmt::Display + fmt::Debug> {
    pub attempts: u32,
    pub last: E,
}

/// Retry policy applied to provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy making at most `max_attempts` attempts, sleeping
    /// `delay` between them.
    ///
    /// # Errors
    ///
    /// Returns `RetryConfigError::ZeroAttempts` if `max_attempts` is zero and
    /// `RetryConfigError::NonPositiveDelay` if `delay` is zero.
    pub const fn new(max_attempts: u32, delay: Duration) -> Result<Self, RetryConfigError> {
        if max_attempts == 0 {
            return Err(RetryConfigError::ZeroAttempts);
        }
        if delay.is_zero() {
            return Err(RetryConfigError::NonPositiveDelay);
        }
        Ok(Self { max_attempts, delay })
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 { self.max_attempts }

    #[must_use]
    pub const fn delay(&self) -> Duration { self.delay }

    /// Runs `op` until it succeeds or the attempts are used up.
    ///
    /// # Errors
    ///
    /// Returns the last error once every attempt has failed.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        E: fmt::Display + fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(op, |_| true).await
    }

    /// Like [`run`](Self::run), but stops early when `should_retry` returns
    /// false for an error.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once every
    /// attempt has failed.
    pub async fn run_if<T, E, F, Fut, P>(&self, mut op: F, should_retry: P) -> Result<T, RetryError<E>>
    where
        E: fmt::Display + fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && should_retry(&err) => {
                    tracing::debug!(attempt, max = self.max_attempts, error = %err, "attempt failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(last) => return Err(RetryError { attempts: attempt, last }),
            }
        }
    }
}
