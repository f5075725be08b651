//! The immutable description of one outbound service call.

use crate::{Error, Result};
use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;

/// Request payload: an ordered JSON object.
///
/// GET payloads are sent as query parameters, every other method sends the
/// payload as a JSON body.
pub type Payload = serde_json::Map<String, Value>;

/// Driver specific knobs keyed by option name.
pub type Options = serde_json::Map<String, Value>;

/// Request headers, keyed exactly as supplied.
pub type Headers = BTreeMap<String, String>;

/// Parses a method name, ignoring case.
///
/// Only the verbs a service client issues are accepted.
///
/// # Examples
///
/// ```
/// use service_client::parse_method;
/// use http::Method;
///
/// assert_eq!(parse_method("post").unwrap(), Method::POST);
/// assert!(parse_method("TRACE").is_err());
/// ```
pub fn parse_method(method: &str) -> Result<Method> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        _ => Err(Error::UnsupportedMethod(method.to_string())),
    }
}

pub(crate) fn ensure_supported(method: &Method) -> Result<()> {
    parse_method(method.as_str()).map(|_| ())
}

/// One dispatched call: method, absolute endpoint, payload, headers and
/// options.
///
/// Built once per dispatch by the [`Client`](crate::Client) after global and
/// per-call values are merged, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    endpoint: String,
    payload: Payload,
    headers: Headers,
    options: Options,
}

impl Request {
    /// Creates a new `Request`.
    pub fn new(
        method: Method,
        endpoint: impl Into<String>,
        payload: Payload,
        headers: Headers,
        options: Options,
    ) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            payload,
            headers,
            options,
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute URL, base URL included.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The request payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The headers sent with the request, excluding the driver's `User-Agent`.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The options handed to the driver.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Reads a single option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}
