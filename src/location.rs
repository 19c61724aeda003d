/*
 *  location.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Location service - resolves the configured address to lat/lng
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

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::TrackerError;

/// A resolved address. `address` is the geocoder's formatted form, not
/// necessarily what was asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn center(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4}, {:.4})", self.address, self.latitude, self.longitude)
    }
}

/// First and last comma separated segments, e.g. "Fulham, United Kingdom".
pub fn short_address(address: &str) -> String {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    match (parts.first(), parts.last()) {
        (Some(first), Some(last)) if parts.len() > 1 => format!("{}, {}", first, last),
        (Some(first), _) => first.to_string(),
        _ => String::new(),
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve free text to coordinates. `TrackerError::Geocode` when there is
    /// no match or the service cannot be reached.
    async fn geocode(&self, address: &str) -> Result<Location, TrackerError>;
}

/// Remembers the last (address, location) pair only. Asking for the same
/// address string again skips the network; anything else replaces it.
pub struct CachedGeocoder {
    inner: Arc<dyn Geocoder>,
    last: Mutex<Option<(String, Location)>>,
}

impl CachedGeocoder {
    pub fn new(inner: Arc<dyn Geocoder>) -> Self {
        Self { inner, last: Mutex::new(None) }
    }

    fn cached(&self, address: &str) -> Option<Location> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match last.as_ref() {
            Some((key, loc)) if key == address => Some(loc.clone()),
            _ => None,
        }
    }

    pub async fn resolve(&self, address: &str) -> Result<Location, TrackerError> {
        if let Some(loc) = self.cached(address) {
            debug!("Geocode cache hit for '{}'", address);
            return Ok(loc);
        }

        let loc = self.inner.geocode(address).await?;
        info!("Location found: {}", loc);

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some((address.to_string(), loc.clone()));
        Ok(loc)
    }

    /// The most recent successful lookup, if any.
    pub fn last_location(&self) -> Option<Location> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.as_ref().map(|(_, loc)| loc.clone())
    }

    pub fn clear(&self) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = None;
    }
}

#[async_trait]
impl Geocoder for CachedGeocoder {
    async fn geocode(&self, address: &str) -> Result<Location, TrackerError> {
        self.resolve(address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn geocode(&self, address: &str) -> Result<Location, TrackerError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
            if address == "nowhere" {
                return Err(TrackerError::Geocode(format!("Could not geocode address: {}", address)));
            }
            Ok(Location {
                address: format!("{}, Somewhere, Earth", address),
                latitude: 51.0 + n,
                longitude: -0.1,
            })
        }
    }

    fn cached() -> (Arc<CountingGeocoder>, CachedGeocoder) {
        let inner = Arc::new(CountingGeocoder { calls: AtomicUsize::new(0) });
        let geo = CachedGeocoder::new(inner.clone());
        (inner, geo)
    }

    #[tokio::test]
    async fn test_same_address_hits_cache() {
        let (inner, geo) = cached();
        let a = geo.resolve("Fulham").await.unwrap();
        let b = geo.resolve("Fulham").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_address_replaces_entry() {
        let (inner, geo) = cached();
        geo.resolve("Fulham").await.unwrap();
        geo.resolve("Putney").await.unwrap();
        geo.resolve("Fulham").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_match_is_exact() {
        let (inner, geo) = cached();
        geo.resolve("Fulham").await.unwrap();
        geo.resolve("fulham").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (inner, geo) = cached();
        assert!(matches!(geo.resolve("nowhere").await, Err(TrackerError::Geocode(_))));
        assert!(geo.resolve("nowhere").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(geo.last_location().is_none());
    }

    #[tokio::test]
    async fn test_clear_forces_lookup() {
        let (inner, geo) = cached();
        geo.resolve("Fulham").await.unwrap();
        geo.clear();
        geo.resolve("Fulham").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("31 Maltings Place, Fulham, London, SW6 2BU, United Kingdom"),
            "31 Maltings Place, United Kingdom"
        );
        assert_eq!(short_address("London"), "London");
        assert_eq!(short_address(" San Francisco , CA "), "San Francisco, CA");
    }
}
