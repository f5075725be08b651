//! Normalized outcome of a dispatched call.
//!
//! The [`Response`] type is the same no matter which driver handled the call:
//! a synchronous round trip fills in the status code, decoded body and
//! headers, while a deferred call yields an empty placeholder that only says
//! the request was accepted for later delivery.

use http::HeaderMap;
use serde_json::{Map, Value};

/// The outcome of a dispatched call.
///
/// # Examples
///
/// ```
/// use service_client::Response;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-request-id", "abc".parse().unwrap());
///
/// let response = Response::from_body(200, r#"{"user":{"name":"Alice"}}"#, headers);
///
/// assert_eq!(response.status_code(), 200);
/// assert_eq!(response.header("X-Request-Id"), Some("abc"));
/// assert_eq!(response.data_path("user.name").unwrap(), "Alice");
/// assert!(response.is_synchronous());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status_code: u16,
    data: Value,
    headers: HeaderMap,
    is_synchronous: bool,
}

impl Response {
    /// Creates a response for a completed network round trip.
    ///
    /// Data that is neither an object nor an array is replaced by an empty
    /// object.
    pub fn synchronous(status_code: u16, data: Value, headers: HeaderMap) -> Self {
        let data = match data {
            Value::Object(_) | Value::Array(_) => data,
            _ => empty(),
        };

        Self {
            status_code,
            data,
            headers,
            is_synchronous: true,
        }
    }

    /// Creates a response for a round trip from its raw body.
    ///
    /// An empty or undecodable body yields empty data rather than an error.
    pub fn from_body(status_code: u16, body: &str, headers: HeaderMap) -> Self {
        let data = serde_json::from_str(body).unwrap_or(Value::Null);
        Self::synchronous(status_code, data, headers)
    }

    /// Creates the placeholder returned for a call handed to the deferred
    /// queue: status `0`, no data, no headers.
    pub fn deferred() -> Self {
        Self {
            status_code: 0,
            data: empty(),
            headers: HeaderMap::new(),
            is_synchronous: false,
        }
    }

    /// The HTTP status code, or `0` when there was no real response.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The decoded response body.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `true` if the response came from an actual network round trip.
    pub fn is_synchronous(&self) -> bool {
        self.is_synchronous
    }

    /// Returns `true` if the response carries no data.
    pub fn is_empty(&self) -> bool {
        match &self.data {
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => true,
        }
    }

    /// Returns a header value by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name.to_ascii_lowercase().as_str())?.to_str().ok()
    }

    /// Returns a top level data entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Resolves a dot separated path into nested data.
    ///
    /// Numeric segments index into arrays. Returns `None` if any segment is
    /// missing.
    ///
    /// # Examples
    ///
    /// ```
    /// # use service_client::Response;
    /// # use http::HeaderMap;
    /// let response = Response::from_body(200, r#"{"items":[{"id":7}]}"#, HeaderMap::new());
    ///
    /// assert_eq!(response.data_path("items.0.id").unwrap(), 7);
    /// assert!(response.data_path("items.1.id").is_none());
    /// ```
    pub fn data_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.data, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_deferred_response_is_empty() {
        let response = Response::deferred();
        assert_eq!(response.status_code(), 0);
        assert!(!response.is_synchronous());
        assert!(response.is_empty());
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_empty_or_invalid_body() {
        assert!(Response::from_body(200, "", HeaderMap::new()).is_empty());
        assert!(Response::from_body(200, "not json", HeaderMap::new()).is_empty());
        assert!(Response::from_body(200, "null", HeaderMap::new()).is_empty());
        assert!(Response::from_body(200, "42", HeaderMap::new()).is_empty());
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let response = Response::synchronous(200, json!({}), headers);

        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_data_access() {
        let response = Response::synchronous(
            200,
            json!({"success": true, "nested": {"level": {"value": "deep"}}}),
            HeaderMap::new(),
        );

        assert_eq!(response.get("success"), Some(&json!(true)));
        assert_eq!(response.data_path("nested.level.value"), Some(&json!("deep")));
        assert_eq!(response.data_path("nested.missing"), None);
        assert_eq!(response.data_path("success.deeper"), None);
    }
}
