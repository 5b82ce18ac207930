//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod osrm_server;
pub mod scripted;

use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;
use tripline_core::retry::RetryPolicy;
use tripline_core::trip::{LonLat, Trip, TripId};

pub fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 7, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// Trip whose pickup longitude equals `key`, so scripted backends can tell trips apart.
pub fn trip(id: i64, key: i64) -> Trip {
    Trip {
        id: TripId::Int(id),
        pickup: Some(LonLat::new(key as f64, 37.0)),
        dropoff: Some(LonLat::new(key as f64 + 0.5, 37.5)),
        start_time: at(10, 0),
        end_time: at(10, 30),
    }
}

pub fn trips(n: i64) -> Vec<Trip> {
    (1..=n).map(|i| trip(i, i)).collect()
}

/// Millisecond-scale retry policy without jitter.
pub fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        initial_wait: Duration::from_millis(1),
        max_wait: Duration::from_millis(5),
        jitter: 0.0,
    }
}
