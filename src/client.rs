//! Service client with global headers, driver selection and request logging.
//!
//! The [`Client`] type is the main entry point for calling a service.
//! Use [`ClientBuilder`] to configure the driver settings and the deferred
//! queue, then the chained configuration methods to manage headers, timeouts
//! and the request log.

use crate::{
    driver::{DeferredDriver, DeferredQueue, HttpDriver, RequestDriver, OPTION_TIMEOUT},
    log::{RequestLog, RequestLogEntry},
    request::ensure_supported,
    DriverSettings, Error, Headers, Options, Payload, Request, Response, Result,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::{HeaderName, HeaderValue, Method};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Headers every client starts out with.
pub const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("Content-type", "application/json"),
    ("Accept", "application/json"),
];

/// A client for one service.
///
/// Every call prepends the base URL to the endpoint, merges the global headers
/// and options with the per-call values (per-call values win), and dispatches
/// through one of two drivers:
///
/// - the [`DeferredDriver`] for non-GET calls while request insurance is on;
/// - the [`HttpDriver`] for everything else.
///
/// # Examples
///
/// ```no_run
/// use service_client::{Client, Payload, Options};
/// use serde_json::json;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), service_client::Error> {
/// let mut client = Client::new("https://users-service.example.com/")?;
/// client
///     .authenticate("username", "password")
///     .set_timeout(Duration::from_secs(10))
///     .enable_request_log(true)
///     .push_global_header("X-Tenant", "acme")?;
///
/// let response = client.get("/users/123", Payload::new(), Options::new()).await?;
/// println!("User: {:?}", response.data_path("user.name"));
///
/// let mut data = Payload::new();
/// data.insert("name".to_string(), json!("Alice"));
/// let created = client.post("/users", data, Options::new()).await?;
/// println!("Created with status {}", created.status_code());
///
/// assert_eq!(client.request_log().len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Client {
    base_url: String,
    http_driver: HttpDriver,
    deferred_driver: Option<DeferredDriver>,
    use_request_insurance: bool,
    global_headers: Headers,
    global_options: Options,
    request_log: Mutex<RequestLog>,
}

impl Client {
    /// Creates a client for the service at `base_url` with settings read from
    /// the environment and no deferred queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `base_url` is empty.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The base URL, without trailing slashes.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends HTTP basic authentication with every request, replacing any
    /// previous `Authorization` header.
    pub fn authenticate(&mut self, username: &str, password: &str) -> &mut Self {
        let credentials = STANDARD.encode(format!("{username}:{password}"));
        self.global_headers
            .insert("Authorization".to_string(), format!("Basic {credentials}"));
        self
    }

    /// Adds a header to every request. An existing header with the same name
    /// is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name or value is not valid on
    /// the wire. The header set is left unchanged.
    pub fn push_global_header(
        &mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<&mut Self> {
        self.push_global_headers([(name, value)])
    }

    /// Adds several headers at once.
    ///
    /// Every header is validated before any is applied, so a single invalid
    /// entry leaves the header set unchanged.
    pub fn push_global_headers<I, K, V>(&mut self, headers: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let validated = validate_headers(headers)?;
        self.global_headers.extend(validated);
        Ok(self)
    }

    /// Removes a global header by its exact name. Removing an absent header
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if `name` is not a valid header name.
    pub fn pop_global_header(&mut self, name: impl AsRef<str>) -> Result<&mut Self> {
        self.pop_global_headers([name])
    }

    /// Removes several global headers at once.
    pub fn pop_global_headers<I, K>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| {
                validate_header_name(name.as_ref())?;
                Ok(name.as_ref().to_string())
            })
            .collect::<Result<Vec<_>>>()?;

        for name in &names {
            self.global_headers.remove(name);
        }
        Ok(self)
    }

    /// The headers sent with every request.
    pub fn global_headers(&self) -> &Headers {
        &self.global_headers
    }

    /// Sets the per-attempt timeout for synchronous requests.
    ///
    /// Deferred requests are not affected.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        let secs = if timeout.subsec_nanos() == 0 {
            Value::from(timeout.as_secs())
        } else {
            Value::from(timeout.as_secs_f64())
        };
        self.push_global_option(OPTION_TIMEOUT, secs)
    }

    /// Reverts to the default timeout from the driver settings.
    pub fn clear_timeout(&mut self) -> &mut Self {
        self.pop_global_option(OPTION_TIMEOUT)
    }

    /// Sets an option passed to the driver on every request.
    pub fn push_global_option(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.global_options.insert(key.into(), value);
        self
    }

    /// Removes a global option. Removing an absent option is a no-op.
    pub fn pop_global_option(&mut self, key: &str) -> &mut Self {
        self.global_options.remove(key);
        self
    }

    /// The options passed to the driver on every request.
    pub fn global_options(&self) -> &Options {
        &self.global_options
    }

    /// Defers every non-GET request to the deferred queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCollaborator`] if the client was built without a
    /// deferred queue.
    pub fn enable_request_insurance(&mut self) -> Result<&mut Self> {
        self.use_request_insurance(true)
    }

    /// Turns deferral of non-GET requests on or off.
    ///
    /// GET requests are always sent synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCollaborator`] when enabling without a deferred
    /// queue. Disabling always succeeds.
    pub fn use_request_insurance(&mut self, enabled: bool) -> Result<&mut Self> {
        if enabled && self.deferred_driver.is_none() {
            return Err(Error::MissingCollaborator {
                feature: "Request Insurance",
            });
        }

        self.use_request_insurance = enabled;
        Ok(self)
    }

    /// Returns `true` if non-GET requests are deferred.
    pub fn uses_request_insurance(&self) -> bool {
        self.use_request_insurance
    }

    /// Starts or stops recording requests in the request log.
    pub fn enable_request_log(&mut self, enabled: bool) -> &mut Self {
        self.log_mut().set_enabled(enabled);
        self
    }

    /// Returns `true` if requests are being recorded.
    pub fn is_request_log_enabled(&self) -> bool {
        self.log().is_enabled()
    }

    /// Removes every entry from the request log.
    pub fn clear_request_log(&mut self) -> &mut Self {
        self.log_mut().clear();
        self
    }

    /// A snapshot of the request log in dispatch order.
    pub fn request_log(&self) -> Vec<RequestLogEntry> {
        self.log().entries().to_vec()
    }

    /// The request log entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if no entry exists at `index`.
    pub fn request_log_entry(&self, index: usize) -> Result<RequestLogEntry> {
        self.log().get(index).cloned()
    }

    /// Makes a GET request. `query` entries are sent as query parameters.
    pub async fn get(&self, endpoint: &str, query: Payload, options: Options) -> Result<Response> {
        self.request(Method::GET, endpoint, query, Headers::new(), options)
            .await
    }

    /// Makes a POST request with a JSON body.
    pub async fn post(&self, endpoint: &str, data: Payload, options: Options) -> Result<Response> {
        self.request(Method::POST, endpoint, data, Headers::new(), options)
            .await
    }

    /// Makes a PUT request with a JSON body.
    pub async fn put(&self, endpoint: &str, data: Payload, options: Options) -> Result<Response> {
        self.request(Method::PUT, endpoint, data, Headers::new(), options)
            .await
    }

    /// Makes a PATCH request with a JSON body.
    pub async fn patch(&self, endpoint: &str, data: Payload, options: Options) -> Result<Response> {
        self.request(Method::PATCH, endpoint, data, Headers::new(), options)
            .await
    }

    /// Makes a DELETE request with a JSON body.
    pub async fn delete(
        &self,
        endpoint: &str,
        data: Payload,
        options: Options,
    ) -> Result<Response> {
        self.request(Method::DELETE, endpoint, data, Headers::new(), options)
            .await
    }

    /// Makes a request with a method given by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedMethod`] for anything but GET, POST, PUT,
    /// PATCH and DELETE.
    pub async fn send(
        &self,
        method: &str,
        endpoint: &str,
        data: Payload,
        options: Options,
    ) -> Result<Response> {
        let method = crate::parse_method(method)?;
        self.request(method, endpoint, data, Headers::new(), options)
            .await
    }

    /// Makes a request with per-call headers.
    ///
    /// Per-call headers and options override the global ones of the same name.
    /// The call is recorded in the request log when logging is enabled, also
    /// when it fails with [`Error::ServiceRequestFailed`]; the error is then
    /// returned unchanged.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        data: Payload,
        headers: Headers,
        options: Options,
    ) -> Result<Response> {
        ensure_supported(&method)?;

        let mut merged_headers = self.global_headers.clone();
        merged_headers.extend(validate_headers(headers)?);

        let mut merged_options = self.global_options.clone();
        merged_options.extend(options);

        let request = Request::new(
            method,
            self.prepend_base_url(endpoint),
            data,
            merged_headers,
            merged_options,
        );

        let driver = self.driver_for(request.method());
        tracing::debug!(
            method = %request.method(),
            endpoint = %request.endpoint(),
            driver = driver.name(),
            "Dispatching request"
        );

        let result = driver.dispatch(&request).await;
        self.log_request(request, &result);
        result
    }

    /// Joins the base URL and `endpoint` with exactly one slash.
    pub fn prepend_base_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn driver_for(&self, method: &Method) -> &dyn RequestDriver {
        match &self.deferred_driver {
            Some(deferred) if self.use_request_insurance && method != Method::GET => {
                deferred as &dyn RequestDriver
            }
            _ => &self.http_driver as &dyn RequestDriver,
        }
    }

    fn log_request(&self, request: Request, result: &Result<Response>) {
        let mut log = self.log();
        if !log.is_enabled() {
            return;
        }

        let response = match result {
            Ok(response) => Some(response.clone()),
            Err(e) => e.to_response(),
        };

        if let Some(response) = response {
            log.record(request, response);
        }
    }

    fn log(&self) -> MutexGuard<'_, RequestLog> {
        self.request_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn log_mut(&mut self) -> &mut RequestLog {
        self.request_log
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("use_request_insurance", &self.use_request_insurance)
            .field("global_headers", &self.global_headers.keys().collect::<Vec<_>>())
            .field("global_options", &self.global_options)
            .finish_non_exhaustive()
    }
}

fn validate_header_name(name: &str) -> Result<()> {
    HeaderName::try_from(name)
        .map(|_| ())
        .map_err(|e| Error::InvalidHeader(format!("Invalid header name {name:?}: {e}")))
}

fn validate_headers<I, K, V>(headers: I) -> Result<Vec<(String, String)>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    headers
        .into_iter()
        .map(|(name, value)| {
            let (name, value) = (name.as_ref(), value.as_ref());
            validate_header_name(name)?;
            HeaderValue::try_from(value).map_err(|e| {
                Error::InvalidHeader(format!("Invalid value for header {name:?}: {e}"))
            })?;
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use service_client::{ClientBuilder, DriverSettings};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), service_client::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://payments-service.example.com")
///     .settings(DriverSettings::default().with_max_retries(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    settings: Option<DriverSettings>,
    http_client: Option<reqwest::Client>,
    deferred_queue: Option<Arc<dyn DeferredQueue>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the service. Trailing slashes are trimmed.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the synchronous driver settings.
    ///
    /// Without this the settings are read from the environment, see
    /// [`DriverSettings::from_env`].
    pub fn settings(mut self, settings: DriverSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Uses an existing `reqwest` client for synchronous requests.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the queue deferred requests are handed to. Without a queue,
    /// request insurance cannot be enabled.
    pub fn deferred_queue(mut self, queue: Arc<dyn DeferredQueue>) -> Self {
        self.deferred_queue = Some(queue);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the base URL is missing or
    /// empty, or if the environment holds invalid driver settings.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                Error::InvalidConfiguration("Service base URL cannot be empty".to_string())
            })?;

        let settings = match self.settings {
            Some(settings) => settings,
            None => DriverSettings::from_env()?,
        };

        let http_driver = match self.http_client {
            Some(client) => HttpDriver::with_client(client, settings),
            None => HttpDriver::new(settings)?,
        };

        Ok(Client {
            base_url,
            http_driver,
            deferred_driver: self.deferred_queue.map(DeferredDriver::new),
            use_request_insurance: false,
            global_headers: DEFAULT_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            global_options: Options::new(),
            request_log: Mutex::new(RequestLog::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueueRecord;
    use async_trait::async_trait;

    struct NullQueue;

    #[async_trait]
    impl DeferredQueue for NullQueue {
        async fn submit(&self, _record: QueueRecord) -> Result<()> {
            Ok(())
        }
    }

    fn client(base_url: &str) -> Client {
        Client::builder()
            .base_url(base_url)
            .settings(DriverSettings::default())
            .build()
            .unwrap()
    }

    fn client_with_queue() -> Client {
        Client::builder()
            .base_url("https://svc.example")
            .settings(DriverSettings::default())
            .deferred_queue(Arc::new(NullQueue))
            .build()
            .unwrap()
    }

    fn header<'a>(client: &'a Client, name: &str) -> Option<&'a str> {
        client.global_headers().get(name).map(String::as_str)
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        for url in ["", "   ", "/", "//"] {
            let result = Client::builder()
                .base_url(url)
                .settings(DriverSettings::default())
                .build();
            assert!(
                matches!(result, Err(Error::InvalidConfiguration(_))),
                "{url:?} should be rejected"
            );
        }

        let result = Client::builder().settings(DriverSettings::default()).build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_base_url_join() {
        let expected = "https://svc.example/a/b";
        for (base, endpoint) in [
            ("https://svc.example", "/a/b"),
            ("https://svc.example/", "a/b"),
            ("https://svc.example//", "//a/b"),
            ("https://svc.example", "a/b"),
        ] {
            assert_eq!(client(base).prepend_base_url(endpoint), expected);
        }
        assert_eq!(client("https://svc.example/").base_url(), "https://svc.example");
    }

    #[test]
    fn test_default_headers() {
        let client = client("https://svc.example");
        assert_eq!(header(&client, "Content-type"), Some("application/json"));
        assert_eq!(header(&client, "Accept"), Some("application/json"));
    }

    #[test]
    fn test_authenticate_overwrites() {
        let mut client = client("https://svc.example");
        client.authenticate("Username", "Password");
        assert_eq!(
            header(&client, "Authorization"),
            Some("Basic VXNlcm5hbWU6UGFzc3dvcmQ=")
        );

        client.authenticate("other", "secret");
        assert_eq!(header(&client, "Authorization"), Some("Basic b3RoZXI6c2VjcmV0"));
    }

    #[test]
    fn test_push_and_pop_headers() {
        let mut client = client("https://svc.example");
        client
            .push_global_header("custom_header", "value")
            .unwrap()
            .push_global_headers([("header1", "value1"), ("header2", "value2"), ("header3", "value3")])
            .unwrap()
            .pop_global_header("header1")
            .unwrap()
            .pop_global_headers(["header3", "never-pushed"])
            .unwrap();

        assert_eq!(header(&client, "custom_header"), Some("value"));
        assert_eq!(header(&client, "header1"), None);
        assert_eq!(header(&client, "header2"), Some("value2"));
        assert_eq!(header(&client, "header3"), None);
    }

    #[test]
    fn test_push_is_last_write_wins() {
        let mut client = client("https://svc.example");
        client.push_global_header("X-Trace", "first").unwrap();
        client.push_global_header("X-Trace", "second").unwrap();
        assert_eq!(header(&client, "X-Trace"), Some("second"));
    }

    #[test]
    fn test_invalid_headers_leave_set_unchanged() {
        let mut client = client("https://svc.example");
        let before = client.global_headers().clone();

        let result = client.push_global_headers([("X-Good", "ok"), ("bad header", "value")]);
        assert!(matches!(result, Err(Error::InvalidHeader(_))));

        let result = client.push_global_header("X-Value", "line\nbreak");
        assert!(matches!(result, Err(Error::InvalidHeader(_))));

        let result = client.pop_global_headers(["Accept", "bad header"]);
        assert!(matches!(result, Err(Error::InvalidHeader(_))));

        assert_eq!(client.global_headers(), &before);
    }

    #[test]
    fn test_timeout_option() {
        let mut client = client("https://svc.example");

        client.set_timeout(Duration::from_secs(10));
        assert_eq!(client.global_options().get(OPTION_TIMEOUT), Some(&Value::from(10u64)));

        client.set_timeout(Duration::from_millis(1500));
        assert_eq!(client.global_options().get(OPTION_TIMEOUT), Some(&Value::from(1.5)));

        client.clear_timeout();
        assert!(client.global_options().get(OPTION_TIMEOUT).is_none());
    }

    #[test]
    fn test_request_insurance_requires_queue() {
        let mut client = client("https://svc.example");

        assert!(matches!(
            client.enable_request_insurance(),
            Err(Error::MissingCollaborator { .. })
        ));
        assert!(!client.uses_request_insurance());
        assert!(client.use_request_insurance(false).is_ok());
    }

    #[test]
    fn test_driver_selection() {
        let mut client = client_with_queue();
        assert_eq!(client.driver_for(&Method::POST).name(), HttpDriver::NAME);

        client.enable_request_insurance().unwrap();
        assert_eq!(client.driver_for(&Method::GET).name(), HttpDriver::NAME);
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert_eq!(client.driver_for(&method).name(), DeferredDriver::NAME);
        }

        client.use_request_insurance(false).unwrap();
        assert_eq!(client.driver_for(&Method::POST).name(), HttpDriver::NAME);
    }

    #[test]
    fn test_request_log_toggle() {
        let mut client = client("https://svc.example");
        assert!(!client.is_request_log_enabled());

        client.enable_request_log(true);
        assert!(client.is_request_log_enabled());
        assert!(client.request_log().is_empty());
        assert!(matches!(
            client.request_log_entry(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_method_is_rejected_before_dispatch() {
        let mut client = client_with_queue();
        client.enable_request_log(true);

        let result = client
            .request(
                Method::OPTIONS,
                "/a",
                Payload::new(),
                Headers::new(),
                Options::new(),
            )
            .await;

        assert!(matches!(result, Err(Error::UnsupportedMethod(_))));
        assert!(client.request_log().is_empty());
    }
}
