//! Pluggable request drivers.
//!
//! A driver takes a fully merged [`Request`] and turns it into a [`Response`].
//! The [`HttpDriver`] performs the call over HTTP with bounded retries, the
//! [`DeferredDriver`] hands it to a durable queue for later delivery. The
//! [`Client`](crate::Client) picks one per call and never needs to know which.

mod deferred;
mod synchronous;

pub use self::deferred::{
    DeferredDriver, DeferredQueue, QueueRecord, OPTION_PRIORITY, OPTION_RETRY_CAP,
    OPTION_RETRY_COUNT, OPTION_RETRY_FACTOR, QUEUE_OPTIONS,
};
pub use self::synchronous::{HttpDriver, OPTION_TIMEOUT};

use crate::{Headers, Request, Response, Result};
use async_trait::async_trait;

/// Dispatches a request and normalizes the outcome.
///
/// Implementations fail with [`Error::ServiceRequestFailed`](crate::Error::ServiceRequestFailed)
/// when the service could not be reached or rejected the call.
#[async_trait]
pub trait RequestDriver: Send + Sync {
    /// A short name identifying the driver, used in its `User-Agent`.
    fn name(&self) -> &'static str;

    /// Dispatches the request.
    async fn dispatch(&self, request: &Request) -> Result<Response>;
}

/// The `User-Agent` a driver announces itself with.
pub fn user_agent(driver_name: &str) -> String {
    format!("ServiceClient/{driver_name}")
}

/// Returns `headers` with the driver's `User-Agent` added, unless the caller
/// already supplied one.
pub(crate) fn with_user_agent(driver_name: &str, headers: &Headers) -> Headers {
    let mut merged = headers.clone();
    let has_user_agent = headers
        .keys()
        .any(|name| name.eq_ignore_ascii_case("user-agent"));

    if !has_user_agent {
        merged.insert("User-Agent".to_string(), user_agent(driver_name));
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_is_added() {
        let headers = with_user_agent("HttpDriver", &Headers::new());
        assert_eq!(
            headers.get("User-Agent").map(String::as_str),
            Some("ServiceClient/HttpDriver")
        );
    }

    #[test]
    fn test_caller_user_agent_wins() {
        let mut headers = Headers::new();
        headers.insert("user-agent".to_string(), "billing/2.1".to_string());

        let merged = with_user_agent("DeferredDriver", &headers);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("user-agent").map(String::as_str), Some("billing/2.1"));
    }
}
