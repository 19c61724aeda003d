/*
 *  geo.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Search box around a point, and great-circle distance
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

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1 degree of latitude, near enough.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// The box is deliberately oversized; the distance filter trims it to a circle.
pub const BOUNDS_WIDENING: f64 = 2.0;

/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Rectangular lat/lon region approximating a search radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north_lat: f64,
    pub south_lat: f64,
    pub west_lon: f64,
    pub east_lon: f64,
}

impl BoundingBox {
    /// Build the query box for `radius_m` around `center` (lat, lon).
    ///
    /// The longitude correction divides by `|lat / 90|` rather than using
    /// `cos(lat)`. Existing deployments were tuned against this shape so it
    /// is kept as is. On the equator the denominator vanishes and the
    /// latitude offset is reused.
    pub fn around(center: (f64, f64), radius_m: f64) -> Self {
        let (lat, lon) = center;
        let lat_offset = (radius_m / METERS_PER_DEGREE) * BOUNDS_WIDENING;
        let lon_offset = if lat != 0.0 {
            (radius_m / (METERS_PER_DEGREE * (lat / 90.0).abs())) * BOUNDS_WIDENING
        } else {
            lat_offset
        };

        BoundingBox {
            north_lat: lat + lat_offset,
            south_lat: lat - lat_offset,
            west_lon: lon - lon_offset,
            east_lon: lon + lon_offset,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat <= self.north_lat && lat >= self.south_lat && lon >= self.west_lon && lon <= self.east_lon
    }

    /// `north,south,west,east` as the FR24 feed expects it.
    pub fn to_query(&self) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.north_lat, self.south_lat, self.west_lon, self.east_lon
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N {:.4} S {:.4} W {:.4} E {:.4}",
            self.north_lat, self.south_lat, self.west_lon, self.east_lon
        )
    }
}

/// Haversine distance in meters between two (lat, lon) points in degrees.
pub fn distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Point `meters` due north of `from`. Handy for building test fixtures.
pub fn offset_north(from: (f64, f64), meters: f64) -> (f64, f64) {
    (from.0 + (meters / EARTH_RADIUS_M).to_degrees(), from.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAMFORD_BRIDGE: (f64, f64) = (51.4748, -0.1879);

    #[test]
    fn test_latitude_offset() {
        let b = BoundingBox::around(STAMFORD_BRIDGE, 3000.0);
        let expected = 3000.0 / 111_000.0 * 2.0;
        assert!((b.north_lat - STAMFORD_BRIDGE.0 - expected).abs() < 1e-12);
        assert!((STAMFORD_BRIDGE.0 - b.south_lat - expected).abs() < 1e-12);
    }

    #[test]
    fn test_longitude_offset_uses_linear_correction() {
        let b = BoundingBox::around(STAMFORD_BRIDGE, 3000.0);
        let expected = 3000.0 / (111_000.0 * (51.4748_f64 / 90.0).abs()) * 2.0;
        assert!((b.east_lon - STAMFORD_BRIDGE.1 - expected).abs() < 1e-12);
        assert!((STAMFORD_BRIDGE.1 - b.west_lon - expected).abs() < 1e-12);
    }

    #[test]
    fn test_equator_reuses_latitude_offset() {
        let b = BoundingBox::around((0.0, 10.0), 5000.0);
        let lat_span = b.north_lat - b.south_lat;
        let lon_span = b.east_lon - b.west_lon;
        assert!((lat_span - lon_span).abs() < 1e-12);
        assert!(lon_span.is_finite());
    }

    #[test]
    fn test_southern_hemisphere_box_is_ordered() {
        let b = BoundingBox::around((-33.8688, 151.2093), 3000.0);
        assert!(b.north_lat > b.south_lat);
        assert!(b.east_lon > b.west_lon);
        assert!(b.contains(-33.8688, 151.2093));
    }

    #[test]
    fn test_distance_along_meridian() {
        let p = offset_north(STAMFORD_BRIDGE, 2500.0);
        assert!((distance_m(STAMFORD_BRIDGE, p) - 2500.0).abs() < 0.01);
    }

    #[test]
    fn test_distance_known_pair() {
        // Heathrow to Gatwick is roughly 40 km
        let lhr = (51.4700, -0.4543);
        let lgw = (51.1537, -0.1821);
        let d = distance_m(lhr, lgw);
        assert!(d > 39_000.0 && d < 41_000.0, "got {d}");
    }

    #[test]
    fn test_query_format() {
        let b = BoundingBox { north_lat: 51.5, south_lat: 51.4, west_lon: -0.3, east_lon: -0.1 };
        assert_eq!(b.to_query(), "51.5000,51.4000,-0.3000,-0.1000");
    }
}
