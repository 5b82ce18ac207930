//! OSRM HTTP backend.
//!
//! Uses the curl crate (libcurl). Each request runs in `spawn_blocking`; curl
//! handles are pooled and reused so keep-alive connections and the DNS cache
//! are shared by all concurrent fetches.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use super::parse::parse_route_response;
use super::{RouteBackend, RouteResponse};
use crate::retry::FetchError;
use crate::trip::LonLat;

const USER_AGENT: &str = concat!("tripline/", env!("CARGO_PKG_VERSION"));

/// Connect and total timeouts for a single request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeouts {
    pub connect: Duration,
    pub total: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            total: Duration::from_secs(120),
        }
    }
}

/// Idle curl handles, capped at the fetch concurrency.
struct HandlePool {
    idle: Mutex<Vec<curl::easy::Easy>>,
    capacity: usize,
}

impl HandlePool {
    fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    fn checkout(&self) -> curl::easy::Easy {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        idle.pop().unwrap_or_else(curl::easy::Easy::new)
    }

    fn checkin(&self, easy: curl::easy::Easy) {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < self.capacity {
            idle.push(easy);
        }
    }
}

/// Routing backend for the OSRM `route` service.
#[derive(Clone)]
pub struct OsrmBackend {
    base: Url,
    profile: String,
    timeouts: RequestTimeouts,
    pool: Arc<HandlePool>,
}

impl OsrmBackend {
    /// `base_url` is the server root (e.g. `https://router.project-osrm.org/`);
    /// `max_idle` bounds how many handles are kept for reuse.
    pub fn new(
        base_url: &str,
        profile: &str,
        timeouts: RequestTimeouts,
        max_idle: usize,
    ) -> Result<Self> {
        let mut base = Url::parse(base_url).with_context(|| format!("invalid router URL: {}", base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("router URL cannot be used as a base: {}", base_url);
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        if profile.is_empty() || profile.contains('/') {
            anyhow::bail!("invalid routing profile: {:?}", profile);
        }
        Ok(Self {
            base,
            profile: profile.to_string(),
            timeouts,
            pool: Arc::new(HandlePool::new(max_idle)),
        })
    }

    /// Request URL for a route with full GeoJSON geometry.
    pub fn route_url(&self, origin: LonLat, destination: LonLat) -> Result<Url> {
        let path = format!(
            "route/v1/{}/{},{};{},{}",
            self.profile, origin.lon, origin.lat, destination.lon, destination.lat
        );
        let mut url = self.base.join(&path).context("build route URL")?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Ok(url)
    }
}

impl RouteBackend for OsrmBackend {
    async fn route(&self, origin: LonLat, destination: LonLat) -> Result<RouteResponse, FetchError> {
        let url = self
            .route_url(origin, destination)
            .map_err(|e| FetchError::Task(format!("{:#}", e)))?;
        let pool = Arc::clone(&self.pool);
        let timeouts = self.timeouts;

        let (code, body) = tokio::task::spawn_blocking(move || get(&pool, url.as_str(), timeouts))
            .await
            .map_err(|e| FetchError::Task(e.to_string()))??;

        match code {
            200..=299 => Ok(parse_route_response(&body)?),
            429 | 500..=599 => Err(FetchError::Http(code)),
            // OSRM reports unroutable input as 4xx with a JSON `code`.
            _ => match parse_route_response(&body) {
                Ok(resp) => Ok(resp),
                Err(_) => Err(FetchError::Http(code)),
            },
        }
    }
}

/// Blocking GET. Returns status code and body.
fn get(pool: &HandlePool, url: &str, timeouts: RequestTimeouts) -> Result<(u32, Vec<u8>), FetchError> {
    let mut easy = pool.checkout();
    let result = perform(&mut easy, url, timeouts);
    if result.is_ok() {
        pool.checkin(easy);
    }
    result
}

fn perform(
    easy: &mut curl::easy::Easy,
    url: &str,
    timeouts: RequestTimeouts,
) -> Result<(u32, Vec<u8>), FetchError> {
    let mut body = Vec::new();
    easy.get(true)?;
    easy.url(url)?;
    easy.useragent(USER_AGENT)?;
    easy.follow_location(true)?;
    easy.connect_timeout(timeouts.connect)?;
    easy.timeout(timeouts.total)?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let code = easy.response_code()?;
    Ok((code, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> OsrmBackend {
        OsrmBackend::new(base, "driving", RequestTimeouts::default(), 4).unwrap()
    }

    #[test]
    fn route_url_has_coordinates_and_geometry_options() {
        let b = backend("https://router.project-osrm.org");
        let url = b
            .route_url(LonLat::new(-122.42, 37.77), LonLat::new(-122.4, 37.8))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://router.project-osrm.org/route/v1/driving/-122.42,37.77;-122.4,37.8?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let b = backend("http://localhost:5000/osrm");
        let url = b.route_url(LonLat::new(1.0, 2.0), LonLat::new(3.0, 4.0)).unwrap();
        assert!(url.as_str().starts_with("http://localhost:5000/osrm/route/v1/driving/1,2;3,4?"));
    }

    #[test]
    fn rejects_bad_profile_and_url() {
        assert!(OsrmBackend::new("not a url", "driving", RequestTimeouts::default(), 1).is_err());
        assert!(OsrmBackend::new("http://x/", "a/b", RequestTimeouts::default(), 1).is_err());
    }
}
