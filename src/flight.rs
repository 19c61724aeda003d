/*
 *  flight.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Normalized flight records and the radius filter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use chrono::{SecondsFormat, Utc};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TrackerError;
use crate::geo;

pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN: &str = "Unknown";

// FR24 feed array layout
const IDX_LAT: usize = 1;
const IDX_LON: usize = 2;
const IDX_HEADING: usize = 3;
const IDX_ALTITUDE: usize = 4;
const IDX_SPEED: usize = 5;
const IDX_AIRCRAFT: usize = 8;
const IDX_REGISTRATION: usize = 9;
const IDX_ORIGIN: usize = 11;
const IDX_DESTINATION: usize = 12;
const IDX_FLIGHT_NUMBER: usize = 13;
const IDX_CALLSIGN: usize = 16;
const MIN_FIELDS: usize = 13;

/// One upstream feed entry, as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFlight {
    pub id: String,
    pub fields: Value,
}

impl RawFlight {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        Self { id: id.into(), fields }
    }

    /// (lat, lon) when both are present and numeric.
    pub fn position(&self) -> Option<(f64, f64)> {
        let arr = self.fields.as_array()?;
        let lat = arr.get(IDX_LAT)?.as_f64()?;
        let lon = arr.get(IDX_LON)?.as_f64()?;
        Some((lat, lon))
    }
}

/// Fixed-shape view of a flight; everything downstream consumes only this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub id: String,
    pub callsign: String,
    pub registration: String,
    pub aircraft: String,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    #[serde(rename = "altitude")]
    pub altitude_ft: i64,
    pub speed: i64,
    pub heading: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "distance")]
    pub distance_m: f64,
    pub timestamp: String,
}

fn text_at(arr: &[Value], idx: usize) -> Option<&str> {
    arr.get(idx).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

fn int_at(arr: &[Value], idx: usize) -> i64 {
    arr.get(idx).and_then(Value::as_f64).map(|v| v as i64).unwrap_or(0)
}

impl FlightRecord {
    /// Normalize a feed entry. Missing fields fall back to "N/A", "Unknown" or 0.
    pub fn from_feed(raw: &RawFlight, distance_m: f64) -> Result<Self, TrackerError> {
        let arr = raw.fields.as_array()
            .filter(|a| a.len() >= MIN_FIELDS)
            .ok_or_else(|| TrackerError::MalformedRecord(raw.id.clone()))?;
        let (latitude, longitude) = raw.position()
            .ok_or_else(|| TrackerError::MalformedRecord(raw.id.clone()))?;

        let callsign = text_at(arr, IDX_CALLSIGN)
            .or_else(|| text_at(arr, IDX_FLIGHT_NUMBER))
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        Ok(FlightRecord {
            id: raw.id.clone(),
            airline: airline_code(&callsign),
            callsign,
            registration: text_at(arr, IDX_REGISTRATION).unwrap_or(NOT_AVAILABLE).to_string(),
            aircraft: text_at(arr, IDX_AIRCRAFT).unwrap_or(UNKNOWN).to_string(),
            origin: text_at(arr, IDX_ORIGIN).unwrap_or(NOT_AVAILABLE).to_string(),
            destination: text_at(arr, IDX_DESTINATION).unwrap_or(NOT_AVAILABLE).to_string(),
            altitude_ft: int_at(arr, IDX_ALTITUDE),
            speed: int_at(arr, IDX_SPEED),
            heading: int_at(arr, IDX_HEADING),
            latitude,
            longitude,
            distance_m: (distance_m * 100.0).round() / 100.0,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        })
    }
}

/// Leading alphabetic run of a callsign ("BAW123" -> "BAW").
pub fn airline_code(callsign: &str) -> String {
    if callsign.chars().count() < 3 {
        return NOT_AVAILABLE.to_string();
    }
    let code: String = callsign.chars().take_while(|c| c.is_alphabetic()).collect();
    if code.is_empty() { NOT_AVAILABLE.to_string() } else { code }
}

/// Keep what lies within `radius_m` of `center`, closest first, at most
/// `max_count` of them. Bad entries are skipped, never fatal.
///
/// Accumulation stops at `max_count` in feed order; sorting happens after,
/// so the result is the first `max_count` matches ranked, not the nearest
/// `max_count` overall.
pub fn filter_and_rank(
    raw_flights: &[RawFlight],
    center: (f64, f64),
    radius_m: f64,
    max_count: usize,
) -> Vec<FlightRecord> {
    let mut in_range: Vec<FlightRecord> = Vec::new();
    if max_count == 0 {
        return in_range;
    }

    for raw in raw_flights {
        let Some(position) = raw.position() else {
            trace!("Skipping {}: no position", raw.id);
            continue;
        };

        let distance = geo::distance_m(center, position);
        if distance > radius_m {
            continue;
        }

        match FlightRecord::from_feed(raw, distance) {
            Ok(record) => in_range.push(record),
            Err(e) => {
                debug!("Skipping flight: {}", e);
                continue;
            }
        }

        if in_range.len() >= max_count {
            break;
        }
    }

    in_range.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    in_range
}
