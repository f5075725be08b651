//! Process-wide settings for the synchronous driver.

use crate::{Error, Result};
use std::time::Duration;

/// Environment variable holding the per-attempt timeout in seconds.
pub const ENV_TIMEOUT: &str = "SERVICE_CLIENT_TIMEOUT";

/// Environment variable holding the maximum number of attempts.
pub const ENV_MAXIMUM_NUMBER_OF_RETRIES: &str = "SERVICE_CLIENT_MAXIMUM_NUMBER_OF_RETRIES";

/// Environment variable holding the delay between attempts in milliseconds.
pub const ENV_RETRY_DELAY: &str = "SERVICE_CLIENT_RETRY_DELAY";

/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// Default number of attempts.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default delay between attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Timeout and retry settings consumed by the
/// [`HttpDriver`](crate::driver::HttpDriver).
///
/// A `timeout` option on an individual call takes precedence over
/// [`timeout`](DriverSettings::timeout).
///
/// # Examples
///
/// ```
/// use service_client::DriverSettings;
/// use std::time::Duration;
///
/// let settings = DriverSettings::default()
///     .with_max_retries(5)
///     .with_retry_delay(Duration::from_millis(250));
///
/// assert_eq!(settings.timeout, Duration::from_secs(3));
/// assert_eq!(settings.max_retries, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    /// Timeout applied to each attempt.
    pub timeout: Duration,
    /// Total number of attempts, the first one included.
    pub max_retries: usize,
    /// Delay before retrying after a server error.
    pub retry_delay: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl DriverSettings {
    /// Reads the settings from the process environment.
    ///
    /// Unset variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if a variable is set but cannot
    /// be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            settings.timeout = raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| invalid(ENV_TIMEOUT, &raw))?;
        }

        if let Some(raw) = lookup(ENV_MAXIMUM_NUMBER_OF_RETRIES) {
            settings.max_retries = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_MAXIMUM_NUMBER_OF_RETRIES, &raw))?;
        }

        if let Some(raw) = lookup(ENV_RETRY_DELAY) {
            let millis = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_RETRY_DELAY, &raw))?;
            settings.retry_delay = Duration::from_millis(millis);
        }

        Ok(settings)
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the total number of attempts.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the delay between attempts.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

fn invalid(key: &str, raw: &str) -> Error {
    Error::InvalidConfiguration(format!("{key} has an invalid value: {raw:?}"))
}
