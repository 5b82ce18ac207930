//! Route request error type for retry classification.

use std::fmt;

/// Error returned by a single routing request (curl failure, HTTP error, or
/// unusable payload). Used so we can classify and decide retries before the
/// client turns the final failure into a fallback or a drop.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (connection, DNS, TLS, etc.).
    Curl(curl::Error),
    /// The request did not complete within the configured timeout.
    Timeout,
    /// HTTP response had a status that is not answered with a route payload.
    Http(u32),
    /// Response body was not a valid routing payload.
    Decode(serde_json::Error),
    /// The blocking transfer task panicked or was cancelled.
    Task(String),
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        if e.is_operation_timedout() {
            FetchError::Timeout
        } else {
            FetchError::Curl(e)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Timeout => write!(f, "request timed out"),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::Decode(e) => write!(f, "invalid route payload: {}", e),
            FetchError::Task(msg) => write!(f, "request task failed: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Decode(e) => Some(e),
            FetchError::Timeout | FetchError::Http(_) | FetchError::Task(_) => None,
        }
    }
}
