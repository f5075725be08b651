//! Retry decisions for the synchronous driver.
//!
//! Each attempt is classified into an [`AttemptOutcome`], and the
//! [`RetryPolicy`] turns the outcome and the attempt number into a
//! [`RetryDecision`]. Client errors are never retried. Server errors are
//! retried after the configured delay. Transport failures are retried
//! immediately, since the attempt already spent its timeout.

use crate::DriverSettings;
use http::StatusCode;
use std::time::Duration;

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A 2xx response.
    Success,
    /// A 4xx response.
    ClientError,
    /// Any other response status (3xx, 5xx, ...).
    ServerError,
    /// No response was received (connection failure or timeout).
    Transport,
}

impl AttemptOutcome {
    /// Classifies a received status code.
    pub fn from_status(status: StatusCode) -> Self {
        if status.is_success() {
            AttemptOutcome::Success
        } else if status.is_client_error() {
            AttemptOutcome::ClientError
        } else {
            AttemptOutcome::ServerError
        }
    }
}

/// What the driver does after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the response to the caller.
    Accept,
    /// Fail with the outcome of this attempt.
    Fail,
    /// Try again after waiting for the given delay.
    Retry(Duration),
}

/// Bounded retry with a fixed delay between server-error attempts.
///
/// # Examples
///
/// ```
/// use service_client::retry::{AttemptOutcome, RetryDecision, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(100));
///
/// assert_eq!(
///     policy.decide(1, AttemptOutcome::ServerError),
///     RetryDecision::Retry(Duration::from_millis(100))
/// );
/// assert_eq!(policy.decide(3, AttemptOutcome::ServerError), RetryDecision::Fail);
/// assert_eq!(policy.decide(1, AttemptOutcome::ClientError), RetryDecision::Fail);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. A `max_attempts` of zero still allows one attempt.
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Builds the policy described by the driver settings.
    pub fn from_settings(settings: &DriverSettings) -> Self {
        Self::new(settings.max_retries, settings.retry_delay)
    }

    /// The total number of attempts.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// The delay applied after a server error.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides what follows `attempt` (1-indexed).
    pub fn decide(&self, attempt: usize, outcome: AttemptOutcome) -> RetryDecision {
        let is_last = attempt >= self.max_attempts;

        match outcome {
            AttemptOutcome::Success => RetryDecision::Accept,
            AttemptOutcome::ClientError => RetryDecision::Fail,
            AttemptOutcome::Transport if is_last => RetryDecision::Fail,
            AttemptOutcome::Transport => RetryDecision::Retry(Duration::ZERO),
            AttemptOutcome::ServerError if is_last => RetryDecision::Fail,
            AttemptOutcome::ServerError => RetryDecision::Retry(self.delay),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&DriverSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_status() {
        assert_eq!(AttemptOutcome::from_status(StatusCode::OK), AttemptOutcome::Success);
        assert_eq!(
            AttemptOutcome::from_status(StatusCode::NO_CONTENT),
            AttemptOutcome::Success
        );
        assert_eq!(
            AttemptOutcome::from_status(StatusCode::NOT_FOUND),
            AttemptOutcome::ClientError
        );
        assert_eq!(
            AttemptOutcome::from_status(StatusCode::SERVICE_UNAVAILABLE),
            AttemptOutcome::ServerError
        );
        assert_eq!(
            AttemptOutcome::from_status(StatusCode::NOT_MODIFIED),
            AttemptOutcome::ServerError
        );
    }

    #[test]
    fn test_server_errors_wait_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        assert_eq!(
            policy.decide(1, AttemptOutcome::ServerError),
            RetryDecision::Retry(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(2, AttemptOutcome::ServerError),
            RetryDecision::Retry(Duration::from_millis(100))
        );
        assert_eq!(policy.decide(3, AttemptOutcome::ServerError), RetryDecision::Fail);
    }

    #[test]
    fn test_transport_failures_retry_without_delay() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        assert_eq!(
            policy.decide(1, AttemptOutcome::Transport),
            RetryDecision::Retry(Duration::ZERO)
        );
        assert_eq!(policy.decide(3, AttemptOutcome::Transport), RetryDecision::Fail);
    }

    #[test]
    fn test_client_errors_and_success_never_retry() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));

        assert_eq!(policy.decide(1, AttemptOutcome::ClientError), RetryDecision::Fail);
        assert_eq!(policy.decide(1, AttemptOutcome::Success), RetryDecision::Accept);
        assert_eq!(policy.decide(5, AttemptOutcome::Success), RetryDecision::Accept);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.decide(1, AttemptOutcome::ServerError), RetryDecision::Fail);
    }
}
