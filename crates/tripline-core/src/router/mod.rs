//! Route fetching from an external routing service.
//!
//! `RouteBackend` is the seam to the network: it performs exactly one request
//! and reports what came back. `RouteClient` layers the retry policy and the
//! fallback rules on top and never fails past its own boundary.

mod client;
mod osrm;
mod parse;

pub use client::{ExhaustedPolicy, RouteClient, RouteOutcome};
pub use osrm::{OsrmBackend, RequestTimeouts};
pub use parse::parse_route_response;

use crate::retry::FetchError;
use crate::trip::LonLat;
use std::future::Future;

/// A route as returned by the service (or synthesized as a straight line).
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// `[lon, lat]` pairs, at least two.
    pub coordinates: Vec<[f64; 2]>,
    /// Seconds.
    pub duration: f64,
    /// Meters.
    pub distance: f64,
    /// Meters per second; 0 when the duration is 0.
    pub average_speed: f64,
}

impl RouteResult {
    /// Build a result, clamping negative or non-finite totals to 0.
    pub fn new(coordinates: Vec<[f64; 2]>, duration: f64, distance: f64) -> Self {
        let duration = non_negative(duration);
        let distance = non_negative(distance);
        let average_speed = if duration > 0.0 {
            distance / duration
        } else {
            0.0
        };
        Self {
            coordinates,
            duration,
            distance,
            average_speed,
        }
    }

    /// Two-point line from origin to destination with zero duration and distance.
    pub fn straight_line(origin: LonLat, destination: LonLat) -> Self {
        Self::new(vec![origin.to_array(), destination.to_array()], 0.0, 0.0)
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// What one request to the routing service produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResponse {
    /// A usable route.
    Found(RouteResult),
    /// The service answered but had no usable route; `code` is its status code.
    NoRoute { code: String },
}

/// One request to a routing service. Implementations do not retry.
pub trait RouteBackend: Send + Sync + 'static {
    fn route(
        &self,
        origin: LonLat,
        destination: LonLat,
    ) -> impl Future<Output = Result<RouteResponse, FetchError>> + Send;
}
