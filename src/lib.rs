//! # service-client - consistent calls to internal HTTP services
//!
//! `service-client` gives every service-to-service call the same contract:
//! global headers and options, basic authentication, bounded retries on
//! transient failures, a request log for auditing and tests, and optional
//! deferral of non-GET requests to a durable queue ("request insurance").
//!
//! ## Quick Start
//!
//! ```no_run
//! use service_client::{Client, Options, Payload};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), service_client::Error> {
//!     let mut client = Client::new("https://users-service.example.com")?;
//!     client.authenticate("username", "password");
//!
//!     let user = client.get("/users/123", Payload::new(), Options::new()).await?;
//!     println!("User: {:?}", user.data_path("name"));
//!
//!     let mut data = Payload::new();
//!     data.insert("name".to_string(), json!("Alice"));
//!     let created = client.post("/users", data, Options::new()).await?;
//!     println!("Created with status {}", created.status_code());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retries
//!
//! The synchronous [`HttpDriver`](driver::HttpDriver) makes up to
//! `SERVICE_CLIENT_MAXIMUM_NUMBER_OF_RETRIES` attempts (default 3), each with a
//! `SERVICE_CLIENT_TIMEOUT` second timeout (default 3). Server errors are
//! retried after `SERVICE_CLIENT_RETRY_DELAY` milliseconds (default 100),
//! transport failures are retried immediately and client errors are never
//! retried. See [`DriverSettings`].
//!
//! ## Request insurance
//!
//! When the client is built with a [`DeferredQueue`] and request insurance is
//! enabled, POST, PUT, PATCH and DELETE calls are serialized into a
//! [`QueueRecord`] and submitted to the queue instead of being sent. The call
//! returns a response with status `0` and `is_synchronous() == false`.
//!
//! ```no_run
//! use service_client::{Client, DeferredQueue, Options, Payload, QueueRecord, Result};
//! use std::sync::Arc;
//!
//! struct OutboxTable;
//!
//! #[async_trait::async_trait]
//! impl DeferredQueue for OutboxTable {
//!     async fn submit(&self, _record: QueueRecord) -> Result<()> {
//!         // INSERT the record into the outbox table
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let mut client = Client::builder()
//!     .base_url("https://payments-service.example.com")
//!     .deferred_queue(Arc::new(OutboxTable))
//!     .build()?;
//! client.enable_request_insurance()?;
//!
//! let response = client.post("/payouts", Payload::new(), Options::new()).await?;
//! assert!(!response.is_synchronous());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod driver;
mod error;
mod log;
mod request;
mod response;
pub mod retry;
mod settings;

pub use client::{Client, ClientBuilder, DEFAULT_HEADERS};
pub use driver::{DeferredQueue, QueueRecord, RequestDriver};
pub use error::{Error, Result};
pub use log::{RequestLog, RequestLogEntry};
pub use request::{parse_method, Headers, Options, Payload, Request};
pub use response::Response;
pub use settings::{
    DriverSettings, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_SECS,
    ENV_MAXIMUM_NUMBER_OF_RETRIES, ENV_RETRY_DELAY, ENV_TIMEOUT,
};
