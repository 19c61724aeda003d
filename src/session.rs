/*
 *  session.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Tracking session: first-seen flights, elapsed time and the stop rule
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

use chrono::{DateTime, Local};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::flight::FlightRecord;
use crate::location::short_address;

/// What is remembered about a callsign the first time it is seen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSighting {
    pub origin: String,
    pub destination: String,
    pub first_seen: DateTime<Local>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub flights_count: usize,
    /// whole seconds
    pub elapsed_time: u64,
    pub elapsed_str: String,
    pub location_short: String,
}

/// HH:MM:SS, hours keep counting past 24.
pub fn format_duration(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[derive(Debug, Clone)]
pub struct SessionTracker {
    started: Option<Instant>,
    seen: HashMap<String, FlightSighting>,
    max_flights: usize,
    max_elapsed: Duration,
    location_short: String,
}

impl SessionTracker {
    pub fn new(max_flights: u32, max_elapsed_secs: u64) -> Self {
        Self {
            started: None,
            seen: HashMap::new(),
            max_flights: max_flights as usize,
            max_elapsed: Duration::from_secs(max_elapsed_secs),
            location_short: String::new(),
        }
    }

    /// New limits apply to the running session straight away.
    pub fn set_limits(&mut self, max_flights: u32, max_elapsed_secs: u64) {
        self.max_flights = max_flights as usize;
        self.max_elapsed = Duration::from_secs(max_elapsed_secs);
    }

    pub fn set_location(&mut self, address: &str) {
        self.location_short = short_address(address);
    }

    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    pub fn start_session(&mut self) {
        self.start_session_at(Instant::now());
    }

    pub fn start_session_at(&mut self, now: Instant) {
        self.seen.clear();
        self.started = Some(now);
        info!("Tracking session started");
    }

    /// Record `flight` if its callsign is new to this session. A repeat
    /// sighting never touches the stored entry. Insertion does not look at
    /// `max_flights`; that only feeds `should_continue`.
    pub fn process_flight(&mut self, flight: &FlightRecord) -> bool {
        if self.seen.contains_key(&flight.callsign) {
            debug!("{} already tracked", flight.callsign);
            return false;
        }

        let sighting = FlightSighting {
            origin: flight.origin.clone(),
            destination: flight.destination.clone(),
            first_seen: Local::now(),
        };
        info!(
            "FLIGHT: {} | FROM: {} | TO: {} | TIME: {}",
            flight.callsign,
            sighting.origin,
            sighting.destination,
            sighting.first_seen.format("%Y-%m-%d %H:%M:%S")
        );
        self.seen.insert(flight.callsign.clone(), sighting);
        true
    }

    pub fn flights_count(&self) -> usize {
        self.seen.len()
    }

    pub fn sighting(&self, callsign: &str) -> Option<&FlightSighting> {
        self.seen.get(callsign)
    }

    pub fn sightings(&self) -> impl Iterator<Item = (&String, &FlightSighting)> {
        self.seen.iter()
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        self.started
            .map(|s| now.saturating_duration_since(s))
            .unwrap_or_default()
    }

    /// Zero valued before a session has started.
    pub fn get_session_stats(&self) -> SessionStats {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&self, now: Instant) -> SessionStats {
        let elapsed = self.elapsed_at(now).as_secs();
        SessionStats {
            flights_count: self.seen.len(),
            elapsed_time: elapsed,
            elapsed_str: format_duration(elapsed),
            location_short: self.location_short.clone(),
        }
    }

    pub fn should_continue(&self) -> bool {
        self.should_continue_at(Instant::now())
    }

    pub fn should_continue_at(&self, now: Instant) -> bool {
        if self.started.is_none() {
            return true;
        }
        self.seen.len() < self.max_flights && self.elapsed_at(now) < self.max_elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight(callsign: &str, origin: &str) -> FlightRecord {
        FlightRecord {
            id: format!("id-{callsign}"),
            callsign: callsign.to_string(),
            registration: "G-EUUU".into(),
            aircraft: "A320".into(),
            airline: "BAW".into(),
            origin: origin.to_string(),
            destination: "EDI".into(),
            altitude_ft: 3500,
            speed: 180,
            heading: 270,
            latitude: 51.48,
            longitude: -0.19,
            distance_m: 1200.0,
            timestamp: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3725), "01:02:05");
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(90_000), "25:00:00");
    }

    #[test]
    fn test_duplicate_callsign_is_not_new() {
        let mut s = SessionTracker::new(20, 1800);
        s.start_session();
        assert!(s.process_flight(&flight("BAW1", "LHR")));
        assert!(!s.process_flight(&flight("BAW1", "LGW")));
        assert_eq!(s.flights_count(), 1);
        assert_eq!(s.sighting("BAW1").unwrap().origin, "LHR");
    }

    #[test]
    fn test_insertion_ignores_max_flights() {
        let mut s = SessionTracker::new(2, 1800);
        s.start_session();
        assert!(s.process_flight(&flight("A1", "LHR")));
        assert!(s.process_flight(&flight("B1", "LHR")));
        assert!(s.process_flight(&flight("C1", "LHR")));
        assert_eq!(s.get_session_stats().flights_count, 3);
        assert!(!s.should_continue());
    }

    #[test]
    fn test_continue_before_start() {
        let s = SessionTracker::new(1, 60);
        assert!(s.should_continue());
        let stats = s.get_session_stats();
        assert_eq!(stats.flights_count, 0);
        assert_eq!(stats.elapsed_time, 0);
        assert_eq!(stats.elapsed_str, "00:00:00");
    }

    #[test]
    fn test_stops_on_elapsed_time() {
        let mut s = SessionTracker::new(20, 60);
        let t0 = Instant::now();
        s.start_session_at(t0);
        assert!(s.should_continue_at(t0 + Duration::from_secs(59)));
        assert!(!s.should_continue_at(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_stats_elapsed() {
        let mut s = SessionTracker::new(20, 7200);
        s.set_location("31 Maltings Place, Fulham, London, United Kingdom");
        let t0 = Instant::now();
        s.start_session_at(t0);
        let stats = s.stats_at(t0 + Duration::from_secs(3725));
        assert_eq!(stats.elapsed_time, 3725);
        assert_eq!(stats.elapsed_str, "01:02:05");
        assert_eq!(stats.location_short, "31 Maltings Place, United Kingdom");
    }

    #[test]
    fn test_restart_resets_seen() {
        let mut s = SessionTracker::new(20, 1800);
        s.start_session();
        s.process_flight(&flight("BAW1", "LHR"));
        s.start_session();
        assert_eq!(s.flights_count(), 0);
        assert!(s.process_flight(&flight("BAW1", "LHR")));
    }

    #[test]
    fn test_set_limits_applies_to_running_session() {
        let mut s = SessionTracker::new(20, 1800);
        s.start_session();
        s.process_flight(&flight("A1", "LHR"));
        assert!(s.should_continue());
        s.set_limits(1, 1800);
        assert!(!s.should_continue());
    }
}
