//! Synchronous HTTP driver with bounded retries.

use super::{with_user_agent, RequestDriver};
use crate::{
    retry::{AttemptOutcome, RetryDecision, RetryPolicy},
    DriverSettings, Error, Headers, Request, Response, Result,
};
use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

/// Option overriding the per-attempt timeout, in seconds.
pub const OPTION_TIMEOUT: &str = "http_timeout";

const NO_RESPONSE_BODY: &str = "No Response: TIMEOUT";

/// Performs calls over HTTP and retries transient failures.
///
/// Each call makes up to [`DriverSettings::max_retries`] attempts:
///
/// - a 2xx response is returned immediately;
/// - a 4xx response fails immediately, retrying cannot fix the request;
/// - any other response is retried after [`DriverSettings::retry_delay`];
/// - a transport failure (no response at all) is retried right away.
///
/// Once the attempts are used up the last outcome is returned as
/// [`Error::ServiceRequestFailed`].
#[derive(Debug, Clone)]
pub struct HttpDriver {
    http_client: reqwest::Client,
    settings: DriverSettings,
}

impl HttpDriver {
    /// The driver name announced in its `User-Agent`.
    pub const NAME: &'static str = "HttpDriver";

    /// Creates a driver with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the HTTP client cannot be
    /// built.
    pub fn new(settings: DriverSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::InvalidConfiguration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self::with_client(http_client, settings))
    }

    /// Creates a driver on top of an existing `reqwest` client.
    pub fn with_client(http_client: reqwest::Client, settings: DriverSettings) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    /// The settings this driver runs with.
    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// The per-attempt timeout for `request`: its `http_timeout` option if it
    /// holds a non-negative number of seconds a [`Duration`] can represent,
    /// the configured default otherwise.
    pub fn resolve_timeout(&self, request: &Request) -> Duration {
        request
            .option(OPTION_TIMEOUT)
            .and_then(Value::as_f64)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(self.settings.timeout)
    }

    /// Executes a single attempt, body included. A body that cannot be read
    /// in full fails the attempt like a missing response.
    async fn send_once(
        &self,
        request: &Request,
        url: &Url,
        headers: &HeaderMap,
        timeout: Duration,
        attempt: usize,
    ) -> std::result::Result<(StatusCode, HeaderMap, String), reqwest::Error> {
        tracing::debug!(
            method = %request.method(),
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut builder = self
            .http_client
            .request(request.method().clone(), url.clone())
            .headers(headers.clone())
            .timeout(timeout);

        if request.method() != Method::GET {
            builder = builder.json(request.payload());
        }

        let response = builder.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response.text().await?;

        Ok((status, response_headers, body))
    }
}

#[async_trait]
impl RequestDriver for HttpDriver {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn dispatch(&self, request: &Request) -> Result<Response> {
        let policy = RetryPolicy::from_settings(&self.settings);
        let timeout = self.resolve_timeout(request);
        let url = request_url(request)?;
        let headers = header_map(&with_user_agent(Self::NAME, request.headers()))?;
        let start_time = Instant::now();

        for attempt in 1..=policy.max_attempts() {
            let (status, response_headers, body) = match self
                .send_once(request, &url, &headers, timeout, attempt)
                .await
            {
                Ok(received) => received,
                Err(e) => match policy.decide(attempt, AttemptOutcome::Transport) {
                    RetryDecision::Retry(_) => {
                        tracing::warn!(
                            error = %e,
                            attempt = attempt,
                            url = %url,
                            "No response received, retrying"
                        );
                        continue;
                    }
                    _ => {
                        tracing::error!(
                            error = %e,
                            attempts = attempt,
                            url = %url,
                            "No response received, giving up"
                        );
                        return Err(Error::ServiceRequestFailed {
                            response_code: 0,
                            response_body: NO_RESPONSE_BODY.to_string(),
                            response_headers: HeaderMap::new(),
                            endpoint: request.endpoint().to_string(),
                            cause: Some(Box::new(e)),
                        });
                    }
                },
            };

            match policy.decide(attempt, AttemptOutcome::from_status(status)) {
                RetryDecision::Accept => {
                    tracing::info!(
                        status = status.as_u16(),
                        latency_ms = start_time.elapsed().as_millis(),
                        attempts = attempt,
                        "Received HTTP response"
                    );
                    return Ok(Response::from_body(status.as_u16(), &body, response_headers));
                }
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        status = status.as_u16(),
                        attempt = attempt,
                        delay_ms = delay.as_millis(),
                        "Server error, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Fail => {
                    tracing::error!(
                        status = status.as_u16(),
                        attempts = attempt,
                        response = %body,
                        "Request failed"
                    );
                    return Err(Error::ServiceRequestFailed {
                        response_code: status.as_u16(),
                        response_body: body,
                        response_headers,
                        endpoint: request.endpoint().to_string(),
                        cause: None,
                    });
                }
            }
        }

        Err(Error::UnreachableState)
    }
}

/// The URL to call. GET payload entries become query parameters.
fn request_url(request: &Request) -> Result<Url> {
    let mut url = Url::parse(request.endpoint())?;

    if request.method() == Method::GET && !request.payload().is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in request.payload() {
            pairs.append_pair(key, &query_value(value));
        }
    }

    Ok(url)
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| Error::InvalidHeader(format!("Invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| Error::InvalidHeader(format!("Invalid header value {value:?}: {e}")))?;
        map.insert(name, value);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Options, Payload};
    use serde_json::json;

    fn request(method: Method, payload: Value, options: Value) -> Request {
        let as_map = |v: Value| match v {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Request::new(
            method,
            "https://svc.example/a/b",
            as_map(payload),
            Headers::new(),
            as_map(options),
        )
    }

    fn driver() -> HttpDriver {
        HttpDriver::with_client(reqwest::Client::new(), DriverSettings::default())
    }

    #[test]
    fn test_timeout_falls_back_to_settings() {
        let req = request(Method::GET, json!({}), json!({}));
        assert_eq!(driver().resolve_timeout(&req), Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_option_wins() {
        let req = request(Method::GET, json!({}), json!({ OPTION_TIMEOUT: 10 }));
        assert_eq!(driver().resolve_timeout(&req), Duration::from_secs(10));

        let req = request(Method::GET, json!({}), json!({ OPTION_TIMEOUT: 0.25 }));
        assert_eq!(driver().resolve_timeout(&req), Duration::from_millis(250));

        let req = request(Method::GET, json!({}), json!({ OPTION_TIMEOUT: "soon" }));
        assert_eq!(driver().resolve_timeout(&req), Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_option_too_large_falls_back() {
        for secs in [json!(1e20), json!(u64::MAX), json!(-1)] {
            let req = request(Method::GET, json!({}), json!({ OPTION_TIMEOUT: secs }));
            assert_eq!(driver().resolve_timeout(&req), Duration::from_secs(3));
        }
    }

    #[test]
    fn test_get_payload_becomes_query() {
        let req = request(
            Method::GET,
            json!({"page": 2, "name": "a b", "active": true}),
            json!({}),
        );
        let url = request_url(&req).unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("name".to_string(), "a b".to_string()),
                ("active".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_get_payload_stays_out_of_url() {
        let req = request(Method::POST, json!({"page": 2}), json!({}));
        assert_eq!(request_url(&req).unwrap().query(), None);

        let req = request(Method::GET, json!({}), json!({}));
        assert_eq!(request_url(&req).unwrap().as_str(), "https://svc.example/a/b");
    }

    #[test]
    fn test_invalid_endpoint() {
        let req = Request::new(
            Method::GET,
            "not a url",
            Payload::new(),
            Headers::new(),
            Options::new(),
        );
        assert!(matches!(request_url(&req), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_header_map_rejects_invalid_values() {
        let mut headers = Headers::new();
        headers.insert("X-Ok".to_string(), "line\nbreak".to_string());
        assert!(matches!(header_map(&headers), Err(Error::InvalidHeader(_))));
    }
}
