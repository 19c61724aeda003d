/*
 *  error.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Failure taxonomy shared by the geocoder, flight provider and tracker
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

use thiserror::Error;

use crate::config::ConfigError;

/// Every failure is scoped to a single operation; nothing here is fatal
/// to the process.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The address could not be resolved, or the geocoder was unreachable.
    #[error("Geocoding error: {0}")]
    Geocode(String),

    /// The flight-data provider was unreachable, rate limited, or returned
    /// something that was not a feed.
    #[error("Flight provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A single flight entry failed normalization. Always swallowed per record.
    #[error("Malformed flight record {0}")]
    MalformedRecord(String),

    /// Loading, validating or persisting configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    /// `UpstreamUnavailable` during a poll is an expected steady state and
    /// callers degrade it to an empty flight list.
    pub fn is_transient(&self) -> bool {
        matches!(self, TrackerError::UpstreamUnavailable(_) | TrackerError::Http(_))
    }
}
