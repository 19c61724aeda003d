/*
 *  tracker.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Area scan (geocode, bound, fetch, filter) and the flight sources
 *  the display agent can poll
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
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::api::SessionStatus;
use crate::client::BackendClient;
use crate::config::{AppConfig, MainConfig, ProviderConfig};
use crate::error::TrackerError;
use crate::flight::{FlightRecord, filter_and_rank};
use crate::geo::BoundingBox;
use crate::geoloc::NominatimGeocoder;
use crate::location::{CachedGeocoder, Geocoder, Location};
use crate::provider::{FlightProvider, Fr24Provider};
use crate::session::SessionStats;

/// One scan of the sky over an address.
#[derive(Debug, Clone)]
pub struct AreaScan {
    pub location: Location,
    pub bounds: BoundingBox,
    pub flights: Vec<FlightRecord>,
}

pub struct FlightTrackerService {
    geocoder: CachedGeocoder,
    provider: Arc<dyn FlightProvider>,
}

impl FlightTrackerService {
    pub fn new(geocoder: Arc<dyn Geocoder>, provider: Arc<dyn FlightProvider>) -> Self {
        Self { geocoder: CachedGeocoder::new(geocoder), provider }
    }

    /// Nominatim + FlightRadar24, per the `[providers]` section.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self, TrackerError> {
        let timeout = cfg.timeout();
        let geocoder = NominatimGeocoder::new(&cfg.geocoder_url, &cfg.user_agent, timeout)?;
        let provider = Fr24Provider::new(&cfg.flights_url, &cfg.details_url, &cfg.user_agent, timeout)?;
        Ok(Self::new(Arc::new(geocoder), Arc::new(provider)))
    }

    /// Flights within `radius_m` of `address`, closest first.
    ///
    /// A geocoding failure is returned to the caller. An unreachable flight
    /// provider is not: the scan comes back with no flights.
    pub async fn get_flights_in_area(
        &self,
        address: &str,
        radius_m: u32,
        max_flights: u32,
    ) -> Result<AreaScan, TrackerError> {
        let location = self.geocoder.resolve(address).await?;
        let center = location.center();
        let bounds = BoundingBox::around(center, radius_m as f64);
        debug!("Searching {}", bounds);

        let raw = match self.provider.flights_in_bounds(&bounds).await {
            Ok(raw) => raw,
            Err(e) if e.is_transient() => {
                warn!("{}; reporting no flights", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let flights = filter_and_rank(&raw, center, radius_m as f64, max_flights as usize);
        debug!("{} of {} feed entries within {} m", flights.len(), raw.len(), radius_m);

        Ok(AreaScan { location, bounds, flights })
    }

    pub async fn flight_details(&self, id: &str) -> Result<Option<Value>, TrackerError> {
        self.provider.flight_details(id).await
    }

    /// Forget the cached geocode; the next scan looks the address up again.
    pub fn clear_cache(&self) {
        self.geocoder.clear();
    }

    pub fn last_location(&self) -> Option<Location> {
        self.geocoder.last_location()
    }
}

/// Where the display agent gets its flights from.
#[async_trait]
pub trait FlightSource: Send + Sync {
    /// Current flights overhead. Failures are logged and read as "none".
    async fn current_flights(&self) -> Vec<FlightRecord>;

    /// Resolved address of the last scan, when this source knows it.
    fn last_address(&self) -> Option<String> {
        None
    }

    fn describe(&self) -> String;

    /// Open a session on the source's side. `false` when the source keeps no
    /// session of its own, or could not open one; the agent's local session
    /// is then the only record.
    async fn start_session(&self) -> bool {
        false
    }

    /// Report one sighting into the source's session. `Some(is_new)` when it
    /// was recorded there.
    async fn report_flight(&self, _flight: &FlightRecord) -> Option<bool> {
        None
    }

    /// Session state as the source sees it.
    async fn session_status(&self) -> Option<SessionStatus> {
        None
    }

    /// Close the source's session, returning its final numbers.
    async fn stop_session(&self) -> Option<SessionStats> {
        None
    }
}

/// Standalone mode: talk to the providers directly.
pub struct DirectSource {
    service: FlightTrackerService,
    main: MainConfig,
}

impl DirectSource {
    pub fn new(service: FlightTrackerService, main: MainConfig) -> Self {
        Self { service, main }
    }
}

#[async_trait]
impl FlightSource for DirectSource {
    async fn current_flights(&self) -> Vec<FlightRecord> {
        match self.service
            .get_flights_in_area(&self.main.address, self.main.search_radius_meters, self.main.max_flights)
            .await
        {
            Ok(scan) => scan.flights,
            Err(e) => {
                error!("Error in standalone mode: {}", e);
                Vec::new()
            }
        }
    }

    fn last_address(&self) -> Option<String> {
        self.service.last_location().map(|l| l.address)
    }

    fn describe(&self) -> String {
        format!("standalone ({})", self.main.address)
    }
}

/// Backend API mode: ask a running `overhead serve`.
pub struct BackendSource {
    client: BackendClient,
}

impl BackendSource {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FlightSource for BackendSource {
    async fn current_flights(&self) -> Vec<FlightRecord> {
        match self.client.flights().await {
            Ok(r) => r.flights,
            Err(e) => {
                error!("Error getting flights from backend: {}", e);
                Vec::new()
            }
        }
    }

    fn describe(&self) -> String {
        format!("API mode: {}", self.client.base_url())
    }

    async fn start_session(&self) -> bool {
        if !self.client.is_available().await {
            warn!("Backend API not available at {}, keeping the session locally", self.client.base_url());
            return false;
        }
        match self.client.start_session().await {
            Ok(r) => {
                info!("Backend: {}", r.message);
                true
            }
            Err(e) => {
                error!("Failed to start session on backend: {}", e);
                false
            }
        }
    }

    async fn report_flight(&self, flight: &FlightRecord) -> Option<bool> {
        self.client
            .process_flight(flight)
            .await
            .inspect_err(|e| error!("Failed to process flight on backend: {}", e))
            .ok()
            .map(|r| r.is_new_flight)
    }

    async fn session_status(&self) -> Option<SessionStatus> {
        self.client
            .session_status()
            .await
            .inspect_err(|e| error!("Failed to check session status from backend: {}", e))
            .ok()
    }

    async fn stop_session(&self) -> Option<SessionStats> {
        self.client
            .stop_session()
            .await
            .inspect_err(|e| error!("Failed to stop session on backend: {}", e))
            .ok()
            .and_then(|r| r.stats)
    }
}

/// Pick the source once, from `main.use_backend_api`.
pub fn source_from_config(cfg: &AppConfig) -> Result<Box<dyn FlightSource>, TrackerError> {
    let source: Box<dyn FlightSource> = if cfg.main.use_backend_api {
        let client = BackendClient::new(&cfg.main.api_url, cfg.providers.timeout())
            .map_err(|e| TrackerError::UpstreamUnavailable(e.to_string()))?;
        Box::new(BackendSource::new(client))
    } else {
        let service = FlightTrackerService::from_config(&cfg.providers)?;
        Box::new(DirectSource::new(service, cfg.main.clone()))
    };
    info!("Flight tracker initialized in {}", source.describe());
    Ok(source)
}
