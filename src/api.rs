/*
 *  api.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  JSON bodies shared by the HTTP API and its client
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

use crate::flight::FlightRecord;
use crate::session::SessionStats;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: String,
    pub session_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightsResponse {
    pub flights: Vec<FlightRecord>,
    pub stats: Option<SessionStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub processed: bool,
    pub is_new_flight: bool,
    pub stats: Option<SessionStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub active: bool,
    pub stats: Option<SessionStats>,
    #[serde(default = "default_true")]
    pub should_continue: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: "success".to_string(), message: message.into(), stats: None }
    }

    pub fn with_stats(mut self, stats: SessionStats) -> Self {
        self.stats = Some(stats);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootScreen {
    pub face: String,
    pub phrase: String,
    pub timestamp: String,
    pub message: String,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
