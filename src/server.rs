/*
 *  server.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  HTTP API over the shared application context
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

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tower_http::timeout::TimeoutLayer;

use crate::activity::{Activity, ActivityLog, Category};
use crate::api::{
    BootScreen, ErrorBody, FlightsResponse, Health, MessageResponse, ProcessResponse, ServiceInfo,
    SessionStatus,
};
use crate::config::{AppConfig, ConfigError, ConfigStore, ConfigUpdate};
use crate::error::TrackerError;
use crate::faces::{Voice, random_boot_face};
use crate::flight::FlightRecord;
use crate::session::SessionTracker;
use crate::tracker::FlightTrackerService;

/// Everything a request handler may touch. Built once in `main`.
pub struct AppContext {
    pub config: RwLock<ConfigStore>,
    pub tracker: FlightTrackerService,
    pub session: Mutex<SessionTracker>,
    pub activities: ActivityLog,
    pub tracking_active: AtomicBool,
}

pub type SharedContext = Arc<AppContext>;

impl AppContext {
    pub fn new(store: ConfigStore, tracker: FlightTrackerService) -> Self {
        let cfg = store.config();
        let mut session = SessionTracker::new(cfg.main.max_flights, cfg.main.max_elapsed_time);
        session.set_location(&cfg.main.address);
        let activities = ActivityLog::new(cfg.logging.max_activities);
        activities.log(Category::System, "Flight tracker API started", None);

        Self {
            config: RwLock::new(store),
            tracker,
            session: Mutex::new(session),
            activities,
            tracking_active: AtomicBool::new(false),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking_active.load(Ordering::SeqCst)
    }
}

/// Failure reply, `{"detail": ...}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        let status = match &e {
            TrackerError::Geocode(_) => StatusCode::BAD_REQUEST,
            TrackerError::Config(ConfigError::Validation(_)) => StatusCode::BAD_REQUEST,
            TrackerError::UpstreamUnavailable(_) | TrackerError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        TrackerError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

pub fn router(ctx: SharedContext, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/boot", get(boot))
        .route("/flights", get(flights))
        .route("/flights/process", post(process_flight))
        .route("/flight/{id}", get(flight_details))
        .route("/config", get(get_config).post(update_config))
        .route("/session/start", post(start_session))
        .route("/session/stop", post(stop_session))
        .route("/session/status", get(session_status))
        .route("/activities", get(get_activities).delete(clear_activities))
        .layer(
            // also bounds how long graceful shutdown waits on a slow request
            TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout),
        )
        .with_state(ctx)
}

/// Bind and serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(ctx: SharedContext, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (bind, timeout) = {
        let store = ctx.config.read().await;
        let server = &store.config().server;
        (server.bind.clone(), Duration::from_secs(server.request_timeout_secs))
    };

    let app = router(ctx, timeout);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to listen on {}", bind))?;
    info!("Starting REST server: {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Starting graceful shutdown for REST server...");
        })
        .await
        .context("REST server failed")?;

    info!("REST server has been shut down.");
    Ok(())
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Flight Tracker API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

async fn health(State(ctx): State<SharedContext>) -> Json<Health> {
    Json(Health {
        status: "healthy".to_string(),
        timestamp: now_utc(),
        session_active: ctx.is_tracking(),
    })
}

async fn boot() -> Json<BootScreen> {
    let (face, phrase) = random_boot_face();
    Json(BootScreen {
        face: face.to_string(),
        phrase: phrase.to_string(),
        timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        message: Voice::on_starting(),
    })
}

async fn flights(State(ctx): State<SharedContext>) -> Result<Json<FlightsResponse>, ApiError> {
    let main = ctx.config.read().await.config().main.clone();

    ctx.activities.log(
        Category::Radar,
        format!("Fetching flights for {} (radius: {}m)", main.address, main.search_radius_meters),
        Some(json!({"address": main.address, "radius": main.search_radius_meters})),
    );

    let scan = ctx.tracker
        .get_flights_in_area(&main.address, main.search_radius_meters, main.max_flights)
        .await
        .inspect_err(|e| {
            error!("Error fetching flights: {}", e);
            ctx.activities.log(Category::Error, e.to_string(), None);
        })?;

    ctx.activities.log(
        Category::Flight,
        format!("Found {} flight(s) in area", scan.flights.len()),
        Some(json!({"count": scan.flights.len()})),
    );

    let mut session = ctx.session.lock().await;
    session.set_location(&scan.location.address);
    if ctx.is_tracking() {
        for flight in &scan.flights {
            if session.process_flight(flight) {
                ctx.activities.log(
                    Category::Flight,
                    Voice::on_flight_detected(&flight.callsign),
                    Some(json!({"callsign": flight.callsign, "from": flight.origin, "to": flight.destination})),
                );
            }
        }
    }
    let stats = session.is_started().then(|| session.get_session_stats());

    Ok(Json(FlightsResponse { flights: scan.flights, stats }))
}

async fn process_flight(
    State(ctx): State<SharedContext>,
    Json(flight): Json<FlightRecord>,
) -> Json<ProcessResponse> {
    let mut session = ctx.session.lock().await;
    let is_new_flight = session.process_flight(&flight);
    if is_new_flight {
        ctx.activities.log(Category::Flight, format!("New flight: {}", flight.callsign), None);
    }
    Json(ProcessResponse {
        processed: true,
        is_new_flight,
        stats: session.is_started().then(|| session.get_session_stats()),
    })
}

async fn flight_details(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match ctx.tracker.flight_details(&id).await {
        Ok(Some(details)) => {
            ctx.activities.log(Category::Flight, format!("Retrieved details for flight {}", id), None);
            Ok(Json(details))
        }
        Ok(None) => Err(ApiError::not_found("Flight not found")),
        Err(e) => {
            ctx.activities.log(Category::Error, format!("Error fetching flight details: {}", e), None);
            Err(e.into())
        }
    }
}

async fn get_config(State(ctx): State<SharedContext>) -> Json<AppConfig> {
    let cfg = ctx.config.read().await.config().clone();
    ctx.activities.log(Category::Config, "Configuration retrieved", None);
    Json(cfg)
}

async fn update_config(
    State(ctx): State<SharedContext>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<AppConfig>, ApiError> {
    let mut store = ctx.config.write().await;
    let changes = store.update(&update).inspect_err(|e| {
        warn!("Failed to update config: {}", e);
        ctx.activities.log(Category::Error, format!("Failed to update config: {}", e), None);
    })?;

    let cfg = store.config().clone();
    drop(store);

    if changes.address_changed {
        ctx.tracker.clear_cache();
    }
    {
        let mut session = ctx.session.lock().await;
        session.set_limits(cfg.main.max_flights, cfg.main.max_elapsed_time);
        if changes.address_changed {
            session.set_location(&cfg.main.address);
        }
    }

    ctx.activities.log(
        Category::Config,
        "Configuration updated",
        serde_json::to_value(&update).ok(),
    );
    Ok(Json(cfg))
}

async fn start_session(State(ctx): State<SharedContext>) -> Json<MessageResponse> {
    let main = ctx.config.read().await.config().main.clone();
    let mut session = ctx.session.lock().await;
    session.set_limits(main.max_flights, main.max_elapsed_time);
    session.start_session();
    ctx.tracking_active.store(true, Ordering::SeqCst);
    ctx.activities.log(Category::System, "Flight tracking session started", None);
    Json(MessageResponse::success("Flight tracking session started"))
}

async fn stop_session(State(ctx): State<SharedContext>) -> Json<MessageResponse> {
    ctx.tracking_active.store(false, Ordering::SeqCst);
    let stats = ctx.session.lock().await.get_session_stats();
    ctx.activities.log(
        Category::System,
        Voice::on_session_complete(stats.flights_count),
        serde_json::to_value(&stats).ok(),
    );
    Json(MessageResponse::success("Flight tracking session stopped").with_stats(stats))
}

async fn session_status(State(ctx): State<SharedContext>) -> Json<SessionStatus> {
    let session = ctx.session.lock().await;
    if !session.is_started() {
        return Json(SessionStatus { active: false, stats: None, should_continue: true });
    }
    Json(SessionStatus {
        active: ctx.is_tracking(),
        stats: Some(session.get_session_stats()),
        should_continue: session.should_continue(),
    })
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    limit: Option<usize>,
    category: Option<String>,
}

async fn get_activities(
    State(ctx): State<SharedContext>,
    Query(q): Query<ActivityQuery>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let category = q.category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()
        .map_err(ApiError::bad_request)?;
    Ok(Json(ctx.activities.get(q.limit, category)))
}

async fn clear_activities(State(ctx): State<SharedContext>) -> Json<MessageResponse> {
    ctx.activities.clear();
    Json(MessageResponse::success("Activity logs cleared"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let geo: ApiError = TrackerError::Geocode("nowhere".into()).into();
        assert_eq!(geo.status(), StatusCode::BAD_REQUEST);

        let invalid: ApiError = ConfigError::Validation("max_flights".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let persist: ApiError = ConfigError::Persist {
            path: "/ro/config.toml".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }.into();
        assert_eq!(persist.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let upstream: ApiError = TrackerError::UpstreamUnavailable("503".into()).into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }
}
