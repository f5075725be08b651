//! Error types for service calls.
//!
//! Every failure raised by this crate is a variant of [`Error`]. Failures that
//! originate from a real (or missing) HTTP response are reported as
//! [`Error::ServiceRequestFailed`], which keeps the raw response code, body and
//! headers so the caller and the request log can inspect exactly what the
//! service answered.

use crate::response::Response;
use http::HeaderMap;

/// The main error type for service calls.
///
/// # Examples
///
/// ```no_run
/// use service_client::{Client, Error, Payload, Options};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new("https://my-service.example.com")?;
///
/// match client.get("/users/123", Payload::new(), Options::new()).await {
///     Ok(response) => println!("Success: {:?}", response.data()),
///     Err(Error::ServiceRequestFailed { response_code, response_body, .. }) => {
///         eprintln!("Service answered {}: {}", response_code, response_body);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The client was configured with an unusable value, such as an empty
    /// base URL or an unparsable driver setting.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A header name or value is not valid on the wire.
    ///
    /// Raised before any network effect, and the header set is left unchanged.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A feature was requested that needs a collaborator the client was not
    /// given.
    #[error("To use the feature \"{feature}\" a deferred queue must be configured first")]
    MissingCollaborator {
        /// The name of the feature that was requested
        feature: &'static str,
    },

    /// The payload or headers could not be encoded for the deferred queue.
    #[error("Failed to serialize request: {0}")]
    Serialization(String),

    /// The service call failed.
    ///
    /// Raised for client errors (never retried), for server errors once the
    /// retries are exhausted, and for transport failures on the final attempt.
    /// A transport failure carries `response_code == 0` and the body
    /// `"No Response: TIMEOUT"`.
    #[error(
        "{}: Failed request [{response_code}] [{endpoint}]: \n {response_body}",
        service_name(.endpoint)
    )]
    ServiceRequestFailed {
        /// The HTTP status code, or `0` when no response was received
        response_code: u16,
        /// The raw, undecoded response body
        response_body: String,
        /// The response headers
        response_headers: HeaderMap,
        /// The absolute URL that was called
        endpoint: String,
        /// The underlying transport error, if any
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The deferred queue refused the record.
    #[error("Deferred queue submission failed: {0}")]
    QueueSubmission(String),

    /// The HTTP method is not one of GET, POST, PUT, PATCH or DELETE.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The effective endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request log entry was read past the end of the log.
    #[error("Request log index {index} is out of range (log holds {len} entries)")]
    IndexOutOfRange {
        /// The requested position
        index: usize,
        /// The number of entries in the log
        len: usize,
    },

    /// The retry loop finished without returning or failing.
    ///
    /// This indicates a logic error in the driver, never a runtime condition.
    #[error("Unexpected state: a request must either succeed or fail")]
    UnreachableState,
}

impl Error {
    /// Returns the response code if this error came from a service call.
    pub fn response_code(&self) -> Option<u16> {
        match self {
            Error::ServiceRequestFailed { response_code, .. } => Some(*response_code),
            _ => None,
        }
    }

    /// Returns the raw response body if this error came from a service call.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::ServiceRequestFailed { response_body, .. } => Some(response_body),
            _ => None,
        }
    }

    /// Returns the response headers if this error came from a service call.
    pub fn response_headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::ServiceRequestFailed {
                response_headers, ..
            } => Some(response_headers),
            _ => None,
        }
    }

    /// Returns `true` if the service rejected the request with a 4xx status.
    ///
    /// # Examples
    ///
    /// ```
    /// use service_client::Error;
    ///
    /// let err = Error::ServiceRequestFailed {
    ///     response_code: 422,
    ///     response_body: "{}".to_string(),
    ///     response_headers: http::HeaderMap::new(),
    ///     endpoint: "https://svc.example/a".to_string(),
    ///     cause: None,
    /// };
    ///
    /// assert!(err.is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        matches!(self.response_code(), Some(code) if (400..500).contains(&code))
    }

    /// Rebuilds the response a failed service call carried.
    ///
    /// The body is decoded the same way a successful response body is, and the
    /// result is marked synchronous since it came from a real round trip.
    /// Returns `None` for errors raised before any response existed.
    pub fn to_response(&self) -> Option<Response> {
        match self {
            Error::ServiceRequestFailed {
                response_code,
                response_body,
                response_headers,
                ..
            } => Some(Response::from_body(
                *response_code,
                response_body,
                response_headers.clone(),
            )),
            _ => None,
        }
    }
}

/// Derives a human readable service name from the first label of the
/// endpoint host: `https://seamless-wallet-stage.example.dk/x` becomes
/// `Seamless Wallet Stage`.
fn service_name(endpoint: &str) -> String {
    let Ok(url) = url::Url::parse(endpoint) else {
        return String::new();
    };
    let Some(host) = url.host_str() else {
        return String::new();
    };

    host.split('.')
        .next()
        .unwrap_or_default()
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A specialized `Result` type for service calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failed(code: u16, body: &str) -> Error {
        Error::ServiceRequestFailed {
            response_code: code,
            response_body: body.to_string(),
            response_headers: HeaderMap::new(),
            endpoint: "https://my-service-stage.lupinsdev.dk/my/get/endpoint".to_string(),
            cause: None,
        }
    }

    #[test]
    fn test_service_name_from_host() {
        assert_eq!(
            service_name("https://seamless-wallet-stage.example.dk/path"),
            "Seamless Wallet Stage"
        );
        assert_eq!(service_name("http://127.0.0.1:8080/x"), "127");
        assert_eq!(service_name("not a url"), "");
    }

    #[test]
    fn test_failed_request_message() {
        let err = failed(500, r#"{"success":false}"#);
        assert_eq!(
            err.to_string(),
            "My Service Stage: Failed request [500] [https://my-service-stage.lupinsdev.dk/my/get/endpoint]: \n {\"success\":false}"
        );
    }

    #[test]
    fn test_to_response_decodes_body() {
        let response = failed(500, r#"{"message":"ERROR"}"#).to_response().unwrap();
        assert_eq!(response.status_code(), 500);
        assert_eq!(response.data(), &json!({"message": "ERROR"}));
        assert!(response.is_synchronous());
    }

    #[test]
    fn test_to_response_with_undecodable_body() {
        let response = failed(0, "No Response: TIMEOUT").to_response().unwrap();
        assert_eq!(response.status_code(), 0);
        assert!(response.is_empty());
    }

    #[test]
    fn test_errors_without_response() {
        let err = Error::InvalidHeader("bad".to_string());
        assert!(err.to_response().is_none());
        assert!(err.response_code().is_none());
        assert!(!err.is_client_error());
        assert!(failed(404, "").is_client_error());
        assert!(!failed(503, "").is_client_error());
    }
}
