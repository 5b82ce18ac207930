//! GeoJSON feature model shared by checkpoint and final output files.
//!
//! One `Feature` per routed trip: a LineString plus `times` aligned index by
//! index with its coordinates. Downstream consumers treat `times[last]` as the
//! trip's completion instant and `coordinates[last]` as its terminal location.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::interpolate;
use crate::router::RouteResult;
use crate::trip::{Trip, TripId};

/// Format of every timestamp written to `times`.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectionType {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureType {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryType {
    #[default]
    LineString,
}

/// How the geometry of a feature was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteQuality {
    /// Route returned by the routing service.
    #[default]
    Full,
    /// Service answered without a usable route; straight line.
    NoRoute,
    /// Service could not be reached after all retries; straight line.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryType,
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(rename = "tripId")]
    pub trip_id: TripId,
    #[serde(with = "local_times")]
    pub times: Vec<NaiveDateTime>,
    pub duration: f64,
    pub distance: f64,
    pub average_speed: f64,
    pub popup: String,
    /// Files written before quality was recorded load as `Full`.
    #[serde(default)]
    pub quality: RouteQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub properties: FeatureProperties,
    pub geometry: Geometry,
}

impl Feature {
    /// Build the feature for `trip` from its route, timestamping every point.
    pub fn from_route(trip: &Trip, route: RouteResult, quality: RouteQuality) -> Self {
        let times = interpolate::assign(trip.start_time, trip.end_time, route.coordinates.len());
        let popup = format!(
            "Trip {}<br>Start: {}<br>End: {}<br>Distance: {:.0}m<br>Duration: {:.0}s<br>Avg Speed: {:.1}m/s",
            trip.id, trip.start_time, trip.end_time, route.distance, route.duration, route.average_speed
        );
        Self {
            kind: FeatureType::Feature,
            properties: FeatureProperties {
                trip_id: trip.id.clone(),
                times,
                duration: route.duration,
                distance: route.distance,
                average_speed: route.average_speed,
                popup,
                quality,
            },
            geometry: Geometry {
                kind: GeometryType::LineString,
                coordinates: route.coordinates,
            },
        }
    }

    pub fn trip_id(&self) -> &TripId {
        &self.properties.trip_id
    }

    /// Check the invariants consumers rely on: non-empty geometry, one
    /// non-decreasing timestamp per coordinate.
    pub fn validate(&self) -> Result<(), String> {
        let times = self.properties.times.len();
        let coords = self.geometry.coordinates.len();
        if coords == 0 {
            return Err(format!("trip {}: empty geometry", self.trip_id()));
        }
        if times != coords {
            return Err(format!(
                "trip {}: {} times for {} coordinates",
                self.trip_id(),
                times,
                coords
            ));
        }
        if self.properties.times.windows(2).any(|w| w[0] > w[1]) {
            return Err(format!("trip {}: times go backwards", self.trip_id()));
        }
        Ok(())
    }
}

/// The unit of both checkpoint and final output. Trip ids are unique within it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: CollectionType,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Ids of every feature in the collection.
    pub fn trip_ids(&self) -> HashSet<TripId> {
        self.features.iter().map(|f| f.trip_id().clone()).collect()
    }

    /// Number of features with the given quality.
    pub fn count_quality(&self, quality: RouteQuality) -> usize {
        self.features
            .iter()
            .filter(|f| f.properties.quality == quality)
            .count()
    }

    /// Append features. The caller guarantees their ids are not present yet.
    pub fn extend(&mut self, features: impl IntoIterator<Item = Feature>) {
        self.features.extend(features);
    }

    /// Remove features whose id already appeared earlier. Returns how many were removed.
    pub fn dedup_by_trip_id(&mut self) -> usize {
        let before = self.features.len();
        let mut seen = HashSet::with_capacity(before);
        self.features.retain(|f| seen.insert(f.trip_id().clone()));
        before - self.features.len()
    }
}

/// Serde adapter: `Vec<NaiveDateTime>` as whole-second local timestamps.
mod local_times {
    use super::TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(times: &[NaiveDateTime], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(times.len()))?;
        for t in times {
            seq.serialize_element(&t.format(TIME_FORMAT).to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NaiveDateTime>, D::Error> {
        let raw: Vec<String> = Vec::deserialize(d)?;
        raw.iter()
            .map(|s| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .map_err(|e| D::Error::custom(format!("bad timestamp {:?}: {}", s, e)))
            })
            .collect()
    }
}
