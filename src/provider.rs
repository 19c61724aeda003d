/*
 *  provider.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  FlightRadar24 feed client
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
use log::{debug, trace};
use mini_moka::sync::Cache;
use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::error::TrackerError;
use crate::flight::RawFlight;
use crate::geo::BoundingBox;

const DETAILS_TTL: Duration = Duration::from_secs(5 * 60);
const DETAILS_CAPACITY: u64 = 200;

#[async_trait]
pub trait FlightProvider: Send + Sync {
    /// Every flight the provider reports inside `bounds`, unfiltered.
    async fn flights_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<RawFlight>, TrackerError>;

    /// Provider detail document for one flight id, `None` when unknown.
    async fn flight_details(&self, id: &str) -> Result<Option<Value>, TrackerError>;
}

/// Pull flight entries out of a feed document, in the order the feed lists
/// them. Entries are arrays keyed by flight id; everything else
/// (`full_count`, `version`, `stats`) is metadata.
pub fn parse_feed(doc: Value) -> Result<Vec<RawFlight>, TrackerError> {
    let Value::Object(map) = doc else {
        return Err(TrackerError::UpstreamUnavailable("feed is not a JSON object".into()));
    };
    Ok(map
        .into_iter()
        .filter(|(_, v)| v.is_array())
        .map(|(id, fields)| RawFlight::new(id, fields))
        .collect())
}

#[derive(Clone)]
pub struct Fr24Provider {
    client: Client,
    feed_url: String,
    details_url: String,
    details: Arc<Cache<String, Value>>,
}

impl Fr24Provider {
    pub fn new(feed_url: &str, details_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, TrackerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(user_agent)
                .map_err(|e| TrackerError::UpstreamUnavailable(format!("invalid user agent: {}", e)))?,
        );
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let details = Arc::new(
            Cache::builder()
                .max_capacity(DETAILS_CAPACITY)
                .time_to_live(DETAILS_TTL)
                .build(),
        );

        Ok(Self {
            client,
            feed_url: feed_url.to_string(),
            details_url: details_url.to_string(),
            details,
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<(StatusCode, Option<Value>), TrackerError> {
        let response = self.client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok((status, None));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| TrackerError::UpstreamUnavailable(e.to_string()))?;
        Ok((status, Some(body)))
    }
}

#[async_trait]
impl FlightProvider for Fr24Provider {
    async fn flights_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<RawFlight>, TrackerError> {
        let query = bounds.to_query();
        debug!("Feed query bounds={}", query);

        let (status, body) = self.get_json(
            &self.feed_url,
            &[
                ("bounds", query.as_str()),
                ("faa", "1"),
                ("satellite", "1"),
                ("mlat", "1"),
                ("flarm", "1"),
                ("adsb", "1"),
                ("gnd", "0"),
                ("air", "1"),
                ("vehicles", "0"),
                ("estimated", "1"),
                ("maxage", "14400"),
                ("gliders", "1"),
                ("stats", "0"),
            ],
        ).await?;

        let doc = body.ok_or_else(|| TrackerError::UpstreamUnavailable(format!("feed returned {}", status)))?;
        let flights = parse_feed(doc)?;
        trace!("Feed returned {} entries", flights.len());
        Ok(flights)
    }

    async fn flight_details(&self, id: &str) -> Result<Option<Value>, TrackerError> {
        if let Some(doc) = self.details.get(&id.to_string()) {
            return Ok(Some(doc));
        }

        let (status, body) = self.get_json(&self.details_url, &[("flight", id), ("version", "1.5")]).await?;
        match body {
            Some(doc) => {
                self.details.insert(id.to_string(), doc.clone());
                Ok(Some(doc))
            }
            None if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST => Ok(None),
            None => Err(TrackerError::UpstreamUnavailable(format!("details returned {}", status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_feed_skips_metadata() {
        let doc = json!({
            "full_count": 12345,
            "version": 4,
            "3a1b2c": ["406A93", 51.47, -0.19, 270, 3500, 180, "2235", "F-EGLL1",
                       "A320", "G-EUUU", 1700000000, "LHR", "EDI", "BA1442", 0, -640, "BAW1442"],
            "3a1b2d": ["4CA2D6", 51.48, -0.20, 90, 2000, 160, "", "", "B738", "EI-DCL",
                       1700000000, "DUB", "LHR", "FR123", 0, 0, "RYR123"],
            "stats": {"total": {"ads-b": 1}}
        });
        let mut flights = parse_feed(doc).unwrap();
        flights.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0].id, "3a1b2c");
        assert_eq!(flights[1].position(), Some((51.48, -0.20)));
    }

    #[test]
    fn test_feed_order_decides_the_cap() {
        use crate::flight::filter_and_rank;

        let doc: Value = serde_json::from_str(r#"{
            "full_count": 2,
            "zzz": ["406A93", 51.4750, -0.1879, 0, 3000, 150, "", "", "A320", "G-EUUU", 0, "LHR", "EDI", "", 0, 0, "FIRST1"],
            "aaa": ["4CA2D6", 51.4749, -0.1879, 0, 3000, 150, "", "", "B738", "EI-DCL", 0, "DUB", "LHR", "", 0, 0, "SECOND2"]
        }"#).unwrap();

        let flights = parse_feed(doc).unwrap();
        let ids: Vec<&str> = flights.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["zzz", "aaa"]);

        let capped = filter_and_rank(&flights, (51.4748, -0.1879), 3000.0, 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].callsign, "FIRST1");
    }

    #[test]
    fn test_parse_feed_rejects_non_object() {
        assert!(matches!(parse_feed(json!([1, 2, 3])), Err(TrackerError::UpstreamUnavailable(_))));
    }

    #[test]
    fn test_parse_empty_feed() {
        assert!(parse_feed(json!({"full_count": 0, "version": 4})).unwrap().is_empty());
    }
}
