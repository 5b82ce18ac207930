//! Trips as read from the input table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trip identifier. Source tables use either integer or text ids; both
/// round-trip through checkpoint files in their original JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TripId {
    Int(i64),
    Text(String),
}

impl TripId {
    /// Parse a table cell: integers become `Int`, anything else non-empty is `Text`.
    pub fn parse(raw: &str) -> Option<TripId> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match raw.parse::<i64>() {
            Ok(n) => TripId::Int(n),
            Err(_) => TripId::Text(raw.to_string()),
        })
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripId::Int(n) => write!(f, "{}", n),
            TripId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for TripId {
    fn from(n: i64) -> Self {
        TripId::Int(n)
    }
}

impl From<&str> for TripId {
    fn from(s: &str) -> Self {
        TripId::Text(s.to_string())
    }
}

/// A geographic coordinate in GeoJSON axis order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Both components are finite numbers (not NaN or infinite).
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// One row of the trip table.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: TripId,
    /// Absent when the source row has no usable pickup coordinate; such trips
    /// are skipped before any request is made.
    pub pickup: Option<LonLat>,
    /// Absent means "same as pickup".
    pub dropoff: Option<LonLat>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl Trip {
    /// Origin of the route request, if the trip is routable at all.
    pub fn origin(&self) -> Option<LonLat> {
        self.pickup.filter(LonLat::is_finite)
    }

    /// Destination of the route request: dropoff, falling back to pickup.
    pub fn destination(&self) -> Option<LonLat> {
        let origin = self.origin()?;
        Some(self.dropoff.filter(LonLat::is_finite).unwrap_or(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 7, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn trip_id_parse_int_and_text() {
        assert_eq!(TripId::parse("42"), Some(TripId::Int(42)));
        assert_eq!(TripId::parse(" abc-1 "), Some(TripId::Text("abc-1".into())));
        assert_eq!(TripId::parse("  "), None);
    }

    #[test]
    fn trip_id_json_keeps_original_form() {
        let ids: Vec<TripId> = serde_json::from_str(r#"[7, "x7"]"#).unwrap();
        assert_eq!(ids, vec![TripId::Int(7), TripId::Text("x7".into())]);
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"[7,"x7"]"#);
    }

    #[test]
    fn destination_defaults_to_pickup() {
        let trip = Trip {
            id: 1.into(),
            pickup: Some(LonLat::new(-122.4, 37.7)),
            dropoff: None,
            start_time: at(10, 0),
            end_time: at(10, 20),
        };
        assert_eq!(trip.destination(), Some(LonLat::new(-122.4, 37.7)));
    }

    #[test]
    fn non_finite_pickup_is_not_routable() {
        let trip = Trip {
            id: 2.into(),
            pickup: Some(LonLat::new(f64::NAN, 37.7)),
            dropoff: Some(LonLat::new(-122.3, 37.8)),
            start_time: at(10, 0),
            end_time: at(10, 20),
        };
        assert!(trip.origin().is_none());
        assert!(trip.destination().is_none());
    }
}
