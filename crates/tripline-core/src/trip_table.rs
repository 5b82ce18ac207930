//! Trip table input (CSV).
//!
//! Expected columns: `trip_ID`, `pickup_location_longitude`,
//! `pickup_location_latitude`, `dropoff_location_longitude`,
//! `dropoff_location_latitude`, `start_time_local`, `end_time_local`.
//! Extra columns are ignored.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io;
use std::path::Path;

use crate::trip::{LonLat, Trip, TripId};

/// Accepted local timestamp layouts (no timezone offset).
const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "trip_ID", default)]
    trip_id: Option<String>,
    #[serde(rename = "pickup_location_longitude", default)]
    pickup_lon: Option<String>,
    #[serde(rename = "pickup_location_latitude", default)]
    pickup_lat: Option<String>,
    #[serde(rename = "dropoff_location_longitude", default)]
    dropoff_lon: Option<String>,
    #[serde(rename = "dropoff_location_latitude", default)]
    dropoff_lat: Option<String>,
    #[serde(rename = "start_time_local", default)]
    start_time: Option<String>,
    #[serde(rename = "end_time_local", default)]
    end_time: Option<String>,
}

/// Row counts from reading a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableReport {
    pub rows: usize,
    pub trips: usize,
    /// Rows without an id or a parsable start/end time.
    pub skipped: usize,
}

/// Read trips from a CSV file.
pub fn read_trips(path: &Path) -> Result<(Vec<Trip>, TableReport)> {
    let file = std::fs::File::open(path).with_context(|| format!("open trip table: {}", path.display()))?;
    read_trips_from(file).with_context(|| format!("read trip table: {}", path.display()))
}

/// Read trips from any CSV source with a header row.
pub fn read_trips_from<R: io::Read>(reader: R) -> Result<(Vec<Trip>, TableReport)> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut trips = Vec::new();
    let mut report = TableReport::default();

    for (i, record) in csv.deserialize::<RawRow>().enumerate() {
        let line = i + 2;
        let row = record.with_context(|| format!("line {}", line))?;
        report.rows += 1;
        match trip_from_row(row) {
            Ok(trip) => trips.push(trip),
            Err(reason) => {
                tracing::warn!("line {}: {}, skipping row", line, reason);
                report.skipped += 1;
            }
        }
    }
    report.trips = trips.len();
    Ok((trips, report))
}

fn trip_from_row(row: RawRow) -> Result<Trip, String> {
    let id = row
        .trip_id
        .as_deref()
        .and_then(TripId::parse)
        .ok_or_else(|| "missing trip id".to_string())?;
    let start_time = required_time(row.start_time.as_deref(), "start_time_local")?;
    let end_time = required_time(row.end_time.as_deref(), "end_time_local")?;

    let pickup = match (coord(&row.pickup_lon), coord(&row.pickup_lat)) {
        (Some(lon), Some(lat)) => Some(LonLat::new(lon, lat)),
        _ => None,
    };
    // Each dropoff component falls back to the pickup component on its own.
    let dropoff = pickup.map(|p| {
        LonLat::new(
            coord(&row.dropoff_lon).unwrap_or(p.lon),
            coord(&row.dropoff_lat).unwrap_or(p.lat),
        )
    });

    Ok(Trip {
        id,
        pickup,
        dropoff,
        start_time,
        end_time,
    })
}

fn required_time(raw: Option<&str>, column: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let raw = raw.ok_or_else(|| format!("missing {}", column))?;
    parse_local_time(raw).ok_or_else(|| format!("unparsable {} {:?}", column, raw))
}

/// Parse a timezone-less local timestamp in any of the accepted layouts.
pub fn parse_local_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Empty, NaN and infinite cells all count as missing.
fn coord(raw: &Option<String>) -> Option<f64> {
    raw.as_deref()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
