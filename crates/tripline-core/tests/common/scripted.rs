//! In-process routing backend with per-trip scripted behavior.
//!
//! Trips are told apart by the integer part of their pickup longitude. Tracks
//! how many requests are in flight at once and how often each trip was asked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tripline_core::retry::FetchError;
use tripline_core::router::{RouteBackend, RouteResponse, RouteResult};
use tripline_core::trip::LonLat;

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Route with this many points.
    Route(usize),
    /// Every request times out.
    AlwaysTimeout,
    /// Every request is rate limited.
    AlwaysThrottled,
    /// Rate limited this many times, then a 4-point route.
    ThrottledThen(usize),
    /// Service has no route.
    NoRoute,
}

pub struct ScriptedBackend {
    behaviors: HashMap<i64, Behavior>,
    default: Behavior,
    latency: Duration,
    calls: Mutex<HashMap<i64, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(default: Behavior) -> Self {
        Self {
            behaviors: HashMap::new(),
            default,
            latency: Duration::from_millis(2),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, key: i64, behavior: Behavior) -> Self {
        self.behaviors.insert(key, behavior);
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls_for(&self, key: i64) -> usize {
        self.calls.lock().unwrap().get(&key).copied().unwrap_or(0)
    }

    /// Keys that were requested at least once, sorted.
    pub fn requested_keys(&self) -> Vec<i64> {
        let mut keys: Vec<i64> = self.calls.lock().unwrap().keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn line(origin: LonLat, destination: LonLat, points: usize) -> RouteResult {
    let points = points.max(2);
    let coords = (0..points)
        .map(|i| {
            let f = i as f64 / (points - 1) as f64;
            [
                origin.lon + (destination.lon - origin.lon) * f,
                origin.lat + (destination.lat - origin.lat) * f,
            ]
        })
        .collect();
    RouteResult::new(coords, 600.0, 4200.0)
}

impl RouteBackend for ScriptedBackend {
    async fn route(&self, origin: LonLat, destination: LonLat) -> Result<RouteResponse, FetchError> {
        let key = origin.lon.trunc() as i64;
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(key).or_insert(0);
            *n += 1;
            *n
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.behaviors.get(&key).copied().unwrap_or(self.default) {
            Behavior::Route(points) => Ok(RouteResponse::Found(line(origin, destination, points))),
            Behavior::AlwaysTimeout => Err(FetchError::Timeout),
            Behavior::AlwaysThrottled => Err(FetchError::Http(429)),
            Behavior::ThrottledThen(n) if call <= n => Err(FetchError::Http(429)),
            Behavior::ThrottledThen(_) => Ok(RouteResponse::Found(line(origin, destination, 4))),
            Behavior::NoRoute => Ok(RouteResponse::NoRoute {
                code: "NoRoute".into(),
            }),
        }
    }
}
