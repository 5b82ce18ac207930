//! Decode OSRM `route` service payloads.

use serde::Deserialize;

use super::{RouteResponse, RouteResult};

#[derive(Debug, Deserialize)]
struct OsrmPayload {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: Option<OsrmGeometry>,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

/// Decode a response body. A payload with `code != "Ok"`, no routes, or fewer
/// than two coordinates is a valid answer meaning "no usable route".
pub fn parse_route_response(body: &[u8]) -> Result<RouteResponse, serde_json::Error> {
    let payload: OsrmPayload = serde_json::from_slice(body)?;
    if payload.code != "Ok" {
        return Ok(RouteResponse::NoRoute { code: payload.code });
    }
    let Some(route) = payload.routes.into_iter().next() else {
        return Ok(RouteResponse::NoRoute { code: payload.code });
    };
    let coordinates = route.geometry.map(|g| g.coordinates).unwrap_or_default();
    if coordinates.len() < 2 {
        return Ok(RouteResponse::NoRoute { code: payload.code });
    }
    Ok(RouteResponse::Found(RouteResult::new(
        coordinates,
        route.duration,
        route.distance,
    )))
}
