//! Deferred dispatch through a durable queue.

use super::{with_user_agent, RequestDriver};
use crate::{Error, Request, Response, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Option setting the queue priority of a deferred request.
pub const OPTION_PRIORITY: &str = "priority";
/// Option setting how many delivery attempts the queue makes.
pub const OPTION_RETRY_COUNT: &str = "retry_count";
/// Option setting the queue's backoff factor.
pub const OPTION_RETRY_FACTOR: &str = "retry_factor";
/// Option setting the queue's maximum backoff.
pub const OPTION_RETRY_CAP: &str = "retry_cap";

/// The options copied verbatim into a [`QueueRecord`].
pub const QUEUE_OPTIONS: [&str; 4] = [
    OPTION_PRIORITY,
    OPTION_RETRY_COUNT,
    OPTION_RETRY_FACTOR,
    OPTION_RETRY_CAP,
];

/// A request as handed to the deferred queue.
///
/// `payload` and `headers` are JSON text. Tuning fields are only present when
/// the caller set the matching option; defaults belong to the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueRecord {
    /// Upper-case HTTP method.
    pub method: String,
    /// Absolute URL to deliver to.
    pub url: String,
    /// JSON encoded payload.
    pub payload: String,
    /// JSON encoded headers, `User-Agent` included.
    pub headers: String,
    /// Queue priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,
    /// Number of delivery attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<Value>,
    /// Backoff factor between delivery attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_factor: Option<Value>,
    /// Upper bound on the backoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_cap: Option<Value>,
}

impl QueueRecord {
    /// Builds the record for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if the payload or headers cannot be
    /// encoded.
    pub fn from_request(request: &Request) -> Result<Self> {
        let headers = with_user_agent(DeferredDriver::NAME, request.headers());
        let option = |key: &str| request.option(key).cloned();

        Ok(Self {
            method: request.method().as_str().to_ascii_uppercase(),
            url: request.endpoint().to_string(),
            payload: encode(request.payload())?,
            headers: encode(&headers)?,
            priority: option(OPTION_PRIORITY),
            retry_count: option(OPTION_RETRY_COUNT),
            retry_factor: option(OPTION_RETRY_FACTOR),
            retry_cap: option(OPTION_RETRY_CAP),
        })
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// The durable queue that takes over delivery of deferred requests.
///
/// Implementations persist the record and deliver it later, out of process.
/// Submission failures must be returned, the driver propagates them to the
/// caller.
///
/// # Examples
///
/// ```
/// use service_client::{QueueRecord, DeferredQueue, Result};
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct MemoryQueue {
///     records: Mutex<Vec<QueueRecord>>,
/// }
///
/// #[async_trait::async_trait]
/// impl DeferredQueue for MemoryQueue {
///     async fn submit(&self, record: QueueRecord) -> Result<()> {
///         self.records.lock().unwrap().push(record);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait DeferredQueue: Send + Sync {
    /// Persists the record for later delivery.
    async fn submit(&self, record: QueueRecord) -> Result<()>;
}

/// Hands requests to a [`DeferredQueue`] instead of sending them.
///
/// The returned response is always [`Response::deferred`]: the driver does not
/// wait for delivery.
#[derive(Clone)]
pub struct DeferredDriver {
    queue: Arc<dyn DeferredQueue>,
}

impl DeferredDriver {
    /// The driver name announced in its `User-Agent`.
    pub const NAME: &'static str = "DeferredDriver";

    /// Creates a driver submitting to `queue`.
    pub fn new(queue: Arc<dyn DeferredQueue>) -> Self {
        Self { queue }
    }
}

impl std::fmt::Debug for DeferredDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredDriver").finish_non_exhaustive()
    }
}

#[async_trait]
impl RequestDriver for DeferredDriver {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn dispatch(&self, request: &Request) -> Result<Response> {
        let record = QueueRecord::from_request(request)?;

        self.queue.submit(record).await?;

        tracing::info!(
            method = %request.method(),
            url = %request.endpoint(),
            "Request deferred to queue"
        );

        Ok(Response::deferred())
    }
}
