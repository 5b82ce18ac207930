//! Retrying route client: one call per trip, always resolves to an outcome.

use serde::{Deserialize, Serialize};

use super::{RouteBackend, RouteResponse, RouteResult};
use crate::retry::{self, ErrorKind, RetryDecision, RetryPolicy};
use crate::trip::LonLat;

/// What to do with a trip once retries are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustedPolicy {
    /// Emit a straight-line route marked as degraded.
    #[default]
    Fallback,
    /// Emit nothing for the trip.
    Drop,
}

/// Result of fetching one route.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Full route from the service.
    Routed(RouteResult),
    /// The service had no usable route; straight line with zero totals.
    Unroutable(RouteResult),
    /// Retries exhausted; straight line with zero totals.
    Fallback(RouteResult),
    /// Retries exhausted under `ExhaustedPolicy::Drop`.
    Dropped,
}

/// Wraps a `RouteBackend` with the retry policy and fallback rules.
pub struct RouteClient<B> {
    backend: B,
    policy: RetryPolicy,
    on_exhausted: ExhaustedPolicy,
}

impl<B: RouteBackend> RouteClient<B> {
    pub fn new(backend: B, policy: RetryPolicy, on_exhausted: ExhaustedPolicy) -> Self {
        Self {
            backend,
            policy,
            on_exhausted,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Fetch a route, retrying transient failures with backoff.
    ///
    /// Never fails: every call ends as a route, a straight-line substitute, or
    /// (under the drop policy) `Dropped`.
    pub async fn fetch(&self, origin: LonLat, destination: LonLat) -> RouteOutcome {
        let mut attempt = 0u32;
        loop {
            let err = match self.backend.route(origin, destination).await {
                Ok(RouteResponse::Found(route)) => return RouteOutcome::Routed(route),
                Ok(RouteResponse::NoRoute { code }) => {
                    tracing::debug!(
                        code = %code,
                        "no route from {},{} to {},{}; using straight line",
                        origin.lon, origin.lat, destination.lon, destination.lat
                    );
                    return RouteOutcome::Unroutable(RouteResult::straight_line(origin, destination));
                }
                Err(e) => e,
            };

            let kind = retry::classify(&err);
            match self.policy.decide(attempt, kind) {
                RetryDecision::RetryAfter(wait) => {
                    if kind == ErrorKind::Throttled {
                        tracing::warn!("rate limited, waiting {:.1}s (retry {})", wait.as_secs_f64(), attempt + 1);
                    } else {
                        tracing::warn!(
                            "route {},{} to {},{} failed: {}; retry {} in {:.1}s",
                            origin.lon,
                            origin.lat,
                            destination.lon,
                            destination.lat,
                            err,
                            attempt + 1,
                            wait.as_secs_f64()
                        );
                    }
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                RetryDecision::NoRetry => {
                    tracing::warn!(
                        attempts = attempt + 1,
                        policy = ?self.on_exhausted,
                        "giving up on route {},{} to {},{}: {}",
                        origin.lon, origin.lat, destination.lon, destination.lat, err
                    );
                    return match self.on_exhausted {
                        ExhaustedPolicy::Fallback => {
                            RouteOutcome::Fallback(RouteResult::straight_line(origin, destination))
                        }
                        ExhaustedPolicy::Drop => RouteOutcome::Dropped,
                    };
                }
            }
        }
    }
}
