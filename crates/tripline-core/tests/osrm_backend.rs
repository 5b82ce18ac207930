//! Integration test: curl backend + route client against a local OSRM-shaped server.

mod common;

use common::osrm_server::{self, Reply, NO_ROUTE, OK_ROUTE};
use std::time::Duration;
use tripline_core::retry::{classify, ErrorKind, FetchError};
use tripline_core::router::{
    ExhaustedPolicy, OsrmBackend, RequestTimeouts, RouteBackend, RouteClient, RouteOutcome,
    RouteResponse,
};
use tripline_core::trip::LonLat;

const ORIGIN: LonLat = LonLat {
    lon: -122.41,
    lat: 37.77,
};
const DEST: LonLat = LonLat {
    lon: -122.39,
    lat: 37.79,
};

fn backend(url: &str, total: Duration) -> OsrmBackend {
    let timeouts = RequestTimeouts {
        connect: Duration::from_secs(2),
        total,
    };
    OsrmBackend::new(url, "driving", timeouts, 4).unwrap()
}

#[tokio::test]
async fn full_route_is_parsed() {
    let server = osrm_server::start(vec![Reply::json(200, OK_ROUTE)]);
    let b = backend(&server.base_url, Duration::from_secs(5));
    match b.route(ORIGIN, DEST).await.unwrap() {
        RouteResponse::Found(r) => {
            assert_eq!(r.coordinates.len(), 4);
            assert_eq!(r.duration, 420.0);
            assert!((r.average_speed - 7.0).abs() < 1e-9);
        }
        other => panic!("expected route, got {:?}", other),
    }
    let paths = server.paths();
    assert_eq!(
        paths[0],
        "/route/v1/driving/-122.41,37.77;-122.39,37.79?overview=full&geometries=geojson"
    );
}

#[tokio::test]
async fn no_route_answer_on_400() {
    let server = osrm_server::start(vec![Reply::json(400, NO_ROUTE)]);
    let b = backend(&server.base_url, Duration::from_secs(5));
    assert_eq!(
        b.route(ORIGIN, DEST).await.unwrap(),
        RouteResponse::NoRoute {
            code: "NoRoute".into()
        }
    );
}

#[tokio::test]
async fn rate_limit_status_is_throttled() {
    let server = osrm_server::start(vec![Reply::json(429, "")]);
    let b = backend(&server.base_url, Duration::from_secs(5));
    let err = b.route(ORIGIN, DEST).await.unwrap_err();
    assert!(matches!(err, FetchError::Http(429)));
    assert_eq!(classify(&err), ErrorKind::Throttled);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = osrm_server::start(vec![
        Reply::json(200, OK_ROUTE).delayed(Duration::from_millis(800))
    ]);
    let b = backend(&server.base_url, Duration::from_millis(200));
    let err = b.route(ORIGIN, DEST).await.unwrap_err();
    assert_eq!(classify(&err), ErrorKind::Timeout);
}

#[tokio::test]
async fn client_retries_through_rate_limit() {
    let server = osrm_server::start(vec![
        Reply::json(429, ""),
        Reply::json(429, ""),
        Reply::json(200, OK_ROUTE),
    ]);
    let client = RouteClient::new(
        backend(&server.base_url, Duration::from_secs(5)),
        common::quick_retry(),
        ExhaustedPolicy::Fallback,
    );
    assert!(matches!(
        client.fetch(ORIGIN, DEST).await,
        RouteOutcome::Routed(ref r) if r.coordinates.len() == 4
    ));
    assert_eq!(server.requests(), 3);
}

#[tokio::test]
async fn client_falls_back_after_server_errors() {
    let server = osrm_server::start(vec![Reply::json(500, "<html>oops</html>")]);
    let client = RouteClient::new(
        backend(&server.base_url, Duration::from_secs(5)),
        common::quick_retry(),
        ExhaustedPolicy::Fallback,
    );
    match client.fetch(ORIGIN, DEST).await {
        RouteOutcome::Fallback(r) => {
            assert_eq!(r.coordinates, vec![ORIGIN.to_array(), DEST.to_array()]);
            assert_eq!(r.distance, 0.0);
        }
        other => panic!("expected fallback, got {:?}", other),
    }
    // first request + 3 retries
    assert_eq!(server.requests(), 4);
}
