use rand::Rng;
use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// This intentionally stays generic; callers can map HTTP status codes,
/// curl errors, or payload failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Response arrived but could not be decoded as a route payload.
    Malformed,
    /// Any other error (not retried).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff with a cap and proportional jitter: each wait is drawn
/// from `[wait * (1 - jitter), wait]`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry.
    pub initial_wait: Duration,
    /// Upper bound on any single wait.
    pub max_wait: Duration,
    /// Fraction of the wait that is randomized, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(120),
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Deterministic backoff: `min(initial_wait * 2^attempt, max_wait)`, attempt from 0.
    pub fn wait(&self, attempt: u32) -> Duration {
        let exp = 1u32 << attempt.min(20);
        self.initial_wait.saturating_mul(exp).min(self.max_wait)
    }

    /// `wait(attempt)` shortened by a random share of at most `jitter`.
    pub fn jittered<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let wait = self.wait(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 || wait.is_zero() {
            return wait;
        }
        let cut: f64 = rng.random_range(0.0..=jitter);
        wait.mul_f64(1.0 - cut)
    }

    /// Decide whether to retry after failed attempt number `attempt` (0 = first request).
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_retries {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_)
            | ErrorKind::Malformed => {
                RetryDecision::RetryAfter(self.jittered(attempt, &mut rand::rng()))
            }
        }
    }
}
