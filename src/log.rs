//! In-memory audit trail of dispatched requests.

use crate::{Error, Request, Response, Result};

/// One dispatched request paired with its outcome.
///
/// For failed calls the response is the one rebuilt from the error, see
/// [`Error::to_response`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogEntry {
    request: Request,
    response: Response,
}

impl RequestLogEntry {
    /// Creates a new entry.
    pub fn new(request: Request, response: Response) -> Self {
        Self { request, response }
    }

    /// The request that was dispatched.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The response it produced.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Splits the entry into its request and response.
    pub fn into_parts(self) -> (Request, Response) {
        (self.request, self.response)
    }
}

/// Append-only request log, disabled by default.
///
/// While disabled, [`record`](RequestLog::record) is a no-op. Entries are only
/// removed by [`clear`](RequestLog::clear).
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    enabled: bool,
    entries: Vec<RequestLogEntry>,
}

impl RequestLog {
    /// Creates an empty, disabled log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if calls are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts or stops recording. Existing entries are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Appends an entry if the log is enabled.
    ///
    /// Returns `true` if the entry was stored.
    pub fn record(&mut self, request: Request, response: Response) -> bool {
        if !self.enabled {
            return false;
        }

        self.entries.push(RequestLogEntry::new(request, response));
        true
    }

    /// All entries in dispatch order.
    pub fn entries(&self) -> &[RequestLogEntry] {
        &self.entries
    }

    /// The entry at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if no entry exists at `index`.
    pub fn get(&self, index: usize) -> Result<&RequestLogEntry> {
        self.entries.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
