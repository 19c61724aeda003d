/*
 *  faces.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Boot faces and the little voice lines shown on the display
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

use rand::seq::IndexedRandom;

// faces are plain ASCII, the built-in mono fonts have nothing else
pub const SLEEPING: &str = "(-__-)";
pub const WAKING: &str = "(o__o)";
pub const RISING: &str = "(^__^)";
pub const DREAMING: &str = "(*__*)";
pub const COFFEE: &str = "(=__=)";
pub const BOOTING: &str = "(0__0)";
pub const STRETCHING: &str = "(#__#)";
pub const GREETING: &str = "(>__<)";
pub const READY: &str = "(O__O)";

pub const BOOT_PHRASES: [(&str, &str); 9] = [
    (SLEEPING, "Oi I was sleeping!"),
    (WAKING, "Wakey wakey!"),
    (RISING, "Rise and shine!"),
    (DREAMING, "Back from dreamland..."),
    (COFFEE, "Did you bring coffee?"),
    (BOOTING, "Booting up with a smile!"),
    (STRETCHING, "Let me stretch first..."),
    (GREETING, "Good morning, world!"),
    (READY, "Ready for takeoff!"),
];

/// A random (face, phrase) pair for the boot screen.
pub fn random_boot_face() -> (&'static str, &'static str) {
    *BOOT_PHRASES.choose(&mut rand::rng()).unwrap_or(&(READY, "Ready for takeoff!"))
}

/// Status lines, picked at random.
pub struct Voice;

impl Voice {
    fn pick(lines: &[String]) -> String {
        lines.choose(&mut rand::rng()).cloned().unwrap_or_default()
    }

    pub fn on_starting() -> String {
        Self::pick(&[
            "Flight Tracker starting up...".to_string(),
            "Scanning the skies...".to_string(),
            "Ready to track flights!".to_string(),
            "Looking up for aircraft...".to_string(),
        ])
    }

    pub fn on_flight_detected(callsign: &str) -> String {
        Self::pick(&[
            format!("Found {} overhead!", callsign),
            format!("Tracking {}", callsign),
            format!("Aircraft {} detected", callsign),
            format!("New flight: {}", callsign),
        ])
    }

    pub fn on_no_flights() -> String {
        Self::pick(&[
            "Sky is quiet today...".to_string(),
            "No aircraft detected".to_string(),
            "Peaceful skies".to_string(),
            "Waiting for flights...".to_string(),
        ])
    }

    pub fn on_session_complete(count: usize) -> String {
        Self::pick(&[
            format!("Session complete! Tracked {} flights", count),
            format!("Found {} aircraft today", count),
            format!("Flight tracking session ended: {} flights", count),
            format!("Monitored {} flights overhead", count),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_face_is_from_table() {
        for _ in 0..20 {
            let pick = random_boot_face();
            assert!(BOOT_PHRASES.contains(&pick));
        }
    }

    #[test]
    fn test_voice_mentions_subject() {
        assert!(Voice::on_flight_detected("BAW12").contains("BAW12"));
        assert!(Voice::on_session_complete(7).contains('7'));
        assert!(!Voice::on_starting().is_empty());
    }
}
