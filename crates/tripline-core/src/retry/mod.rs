//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures, malformed payloads) and exponential backoff decisions
//! so the route client and any future callers share one consistent policy.

mod classify;
mod error;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
