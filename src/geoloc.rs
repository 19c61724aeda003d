/*
 *  geoloc.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
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
use log::trace;
use reqwest::{Client, header};
use serde::Deserialize;
use std::time::Duration;

use crate::error::TrackerError;
use crate::location::{Geocoder, Location};

/// One hit from the Nominatim search endpoint. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
}

impl NominatimPlace {
    fn into_location(self) -> Result<Location, TrackerError> {
        let latitude = self.lat.parse::<f64>()
            .map_err(|_| TrackerError::Geocode(format!("bad latitude '{}'", self.lat)))?;
        let longitude = self.lon.parse::<f64>()
            .map_err(|_| TrackerError::Geocode(format!("bad longitude '{}'", self.lon)))?;
        Ok(Location { address: self.display_name, latitude, longitude })
    }
}

pub struct NominatimGeocoder {
    client: Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self, TrackerError> {
        let mut headers = header::HeaderMap::new();
        // Nominatim's usage policy rejects requests without an identifying agent
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(user_agent)
                .map_err(|e| TrackerError::Geocode(format!("invalid user agent: {}", e)))?,
        );
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Location, TrackerError> {
        let places = self.client
            .get(&self.url)
            .query(&[("q", address), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await
            .and_then(|r| r.error_for_status()) // none 2xx raise
            .map_err(|e| TrackerError::Geocode(e.to_string()))?
            .json::<Vec<NominatimPlace>>()
            .await
            .map_err(|e| TrackerError::Geocode(e.to_string()))?;

        trace!("Received {} place(s) from Nominatim.", places.len());

        places
            .into_iter()
            .next()
            .ok_or_else(|| TrackerError::Geocode(format!("Could not geocode address: {}", address)))?
            .into_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_parses_string_coordinates() {
        let raw = r#"[{"lat":"51.4748","lon":"-0.1879","display_name":"Fulham, London, United Kingdom","importance":0.6}]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(raw).unwrap();
        let loc = places.into_iter().next().unwrap().into_location().unwrap();
        assert_eq!(loc.latitude, 51.4748);
        assert_eq!(loc.longitude, -0.1879);
        assert_eq!(loc.address, "Fulham, London, United Kingdom");
    }

    #[test]
    fn test_place_with_garbage_coordinates() {
        let place = NominatimPlace { lat: "north".into(), lon: "0".into(), display_name: "x".into() };
        assert!(matches!(place.into_location(), Err(TrackerError::Geocode(_))));
    }
}
