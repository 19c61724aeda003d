/*
 *  agent.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Display agent: polls a flight source, keeps a local session and
 *  rotates the current flights across the e-ink screen
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

use chrono::Local;
use embedded_graphics::pixelcolor::BinaryColor;
use log::{debug, error, info};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::api::SessionStatus;
use crate::config::{AppConfig, UiConfig};
use crate::faces::{Voice, random_boot_face};
use crate::flight::FlightRecord;
use crate::session::{SessionStats, SessionTracker};
use crate::tracker::FlightSource;
use crate::vframebuf::FrameBuf;
use crate::view::{DisplayField, FlightView};

/// Somewhere finished frames go.
pub trait FrameSink: Send {
    fn show(&mut self, frame: &FrameBuf<BinaryColor>) -> std::io::Result<()>;
}

/// Development display: overwrite one PBM file per frame.
pub struct PbmFile {
    path: PathBuf,
}

impl PbmFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSink for PbmFile {
    fn show(&mut self, frame: &FrameBuf<BinaryColor>) -> std::io::Result<()> {
        fs::write(&self.path, frame.to_pbm())
    }
}

/// No panel attached; frames are dropped.
pub struct Headless;

impl FrameSink for Headless {
    fn show(&mut self, _frame: &FrameBuf<BinaryColor>) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn sink_from_config(ui: &UiConfig) -> Box<dyn FrameSink> {
    match ui.output.as_ref() {
        Some(p) => {
            info!("Writing frames to {}", p.display());
            Box::new(PbmFile::new(p))
        }
        None => {
            info!("No display output configured, running headless");
            Box::new(Headless)
        }
    }
}

fn clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

pub struct Agent {
    source: Box<dyn FlightSource>,
    sink: Box<dyn FrameSink>,
    session: SessionTracker,
    view: FlightView,
    fields: Vec<DisplayField>,
    ui: UiConfig,
    flights: Vec<FlightRecord>,
    current: usize,
    // set once the source has opened a session of its own
    remote_session: bool,
    remote: Option<SessionStatus>,
}

impl Agent {
    pub fn new(cfg: &AppConfig, source: Box<dyn FlightSource>, sink: Box<dyn FrameSink>) -> Self {
        let mut session = SessionTracker::new(cfg.main.max_flights, cfg.main.max_elapsed_time);
        session.set_location(&cfg.main.address);
        Self {
            source,
            sink,
            session,
            view: FlightView::new(cfg.ui.width, cfg.ui.height, cfg.ui.rotate),
            fields: DisplayField::parse_list(&cfg.main.display_fields),
            ui: cfg.ui.clone(),
            flights: Vec::new(),
            current: 0,
            remote_session: false,
            remote: None,
        }
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    /// The source's session numbers when it keeps one, the local ones otherwise.
    pub fn stats(&self) -> SessionStats {
        self.remote
            .as_ref()
            .and_then(|s| s.stats.clone())
            .unwrap_or_else(|| self.session.get_session_stats())
    }

    pub fn should_continue(&self) -> bool {
        match self.remote.as_ref() {
            Some(s) if s.stats.is_some() => s.should_continue,
            _ => self.session.should_continue(),
        }
    }

    /// Open the local session, and the source's as well when it has one.
    pub async fn start_session(&mut self) {
        self.session.start_session();
        self.remote_session = self.source.start_session().await;
        self.remote = None;
    }

    fn present(&mut self, frame: &FrameBuf<BinaryColor>) {
        if let Err(e) = self.sink.show(frame) {
            error!("Failed to write display frame: {}", e);
        }
    }

    /// Show the boot face. Returns false if a stop arrived meanwhile.
    pub async fn boot(&mut self, stop: &mut watch::Receiver<bool>) -> bool {
        let (face, phrase) = random_boot_face();
        info!("Boot: {}", phrase);
        let frame = self.view.render_boot(face, phrase, &clock());
        self.present(&frame);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(self.ui.boot_screen_duration)) => true,
            _ = stop.changed() => false,
        }
    }

    /// Fetch once and record everything into the session. Returns how many
    /// callsigns were new.
    pub async fn poll_once(&mut self) -> usize {
        debug!("Fetching flights...");
        self.flights = self.source.current_flights().await;
        if let Some(address) = self.source.last_address() {
            self.session.set_location(&address);
        }
        info!("Found {} flight(s)", self.flights.len());

        if self.flights.is_empty() {
            info!("{}", Voice::on_no_flights());
        }

        let mut new = 0;
        for flight in &self.flights {
            let is_new = self.session.process_flight(flight);
            if self.remote_session {
                if let Some(remote_new) = self.source.report_flight(flight).await {
                    debug!("Backend recorded {} (new: {})", flight.callsign, remote_new);
                }
            }
            if is_new {
                info!("{}", Voice::on_flight_detected(&flight.callsign));
                new += 1;
            }
        }
        if self.remote_session {
            self.remote = self.source.session_status().await;
        }
        if self.current >= self.flights.len() {
            self.current = 0;
        }
        new
    }

    /// Draw the next flight in rotation. Nothing to draw, nothing drawn.
    pub fn show_next(&mut self) -> Option<&FlightRecord> {
        if self.flights.is_empty() {
            return None;
        }
        let idx = self.current % self.flights.len();
        let stats = self.stats();
        let frame = self.view.render_flight(&self.flights[idx], &stats, &self.fields, &clock());
        debug!("Displaying flight: {}", self.flights[idx].callsign);
        self.present(&frame);
        self.current = (idx + 1) % self.flights.len();
        self.flights.get(idx)
    }

    /// Boot, then poll and rotate until the session runs out or `stop` flips.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> SessionStats {
        info!("{}", Voice::on_starting());
        info!("Flight source: {}", self.source.describe());

        if *stop.borrow_and_update() || !self.boot(&mut stop).await {
            info!("Stopped during boot");
            return self.session.get_session_stats();
        }

        self.start_session().await;
        info!("Entering main flight tracking loop");

        let mut fetch = interval(Duration::from_secs(self.ui.fetch_interval.max(1)));
        fetch.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rotate = interval(Duration::from_secs(self.ui.flight_rotation_interval.max(1)));
        rotate.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *stop.borrow_and_update() {
                info!("Agent received stop signal.");
                break;
            }
            if !self.should_continue() {
                info!("Session limits reached");
                break;
            }

            tokio::select! {
                _ = fetch.tick() => {
                    self.poll_once().await;
                }
                _ = rotate.tick() => {
                    self.show_next();
                }
                changed = stop.changed() => {
                    if changed.is_err() {
                        info!("Stop channel closed.");
                        break;
                    }
                }
            }
        }

        for (callsign, s) in self.session.sightings() {
            debug!("{}: {} -> {} first seen {}", callsign, s.origin, s.destination, s.first_seen.format("%H:%M:%S"));
        }

        let remote = if self.remote_session { self.source.stop_session().await } else { None };
        let stats = remote.unwrap_or_else(|| self.session.get_session_stats());
        info!("{}", Voice::on_session_complete(stats.flights_count));
        info!(
            "Session summary: {} flight(s) over {} in {}",
            stats.flights_count, stats.location_short, stats.elapsed_str
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FixedSource(Vec<FlightRecord>);

    #[async_trait]
    impl FlightSource for FixedSource {
        async fn current_flights(&self) -> Vec<FlightRecord> {
            self.0.clone()
        }

        fn last_address(&self) -> Option<String> {
            Some("Fulham, London, United Kingdom".into())
        }

        fn describe(&self) -> String {
            "fixed".into()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<usize>>);

    impl FrameSink for Recorder {
        fn show(&mut self, _frame: &FrameBuf<BinaryColor>) -> std::io::Result<()> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn flight(callsign: &str) -> FlightRecord {
        FlightRecord {
            id: callsign.to_lowercase(),
            callsign: callsign.into(),
            registration: "G-EUUU".into(),
            aircraft: "A320".into(),
            airline: "BAW".into(),
            origin: "LHR".into(),
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

    fn config(max_flights: u32) -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.main.max_flights = max_flights;
        cfg.ui.boot_screen_duration = 0;
        cfg
    }

    #[tokio::test]
    async fn test_poll_and_rotate() {
        let recorder = Recorder::default();
        let source = FixedSource(vec![flight("BAW1"), flight("EZY2")]);
        let mut agent = Agent::new(&config(20), Box::new(source), Box::new(recorder.clone()));
        agent.session.start_session();

        assert_eq!(agent.poll_once().await, 2);
        assert_eq!(agent.poll_once().await, 0);
        assert_eq!(agent.session().get_session_stats().location_short, "Fulham, United Kingdom");

        assert_eq!(agent.show_next().map(|f| f.callsign.clone()), Some("BAW1".into()));
        assert_eq!(agent.show_next().map(|f| f.callsign.clone()), Some("EZY2".into()));
        assert_eq!(agent.show_next().map(|f| f.callsign.clone()), Some("BAW1".into()));
        assert_eq!(*recorder.0.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_nothing_to_show() {
        let mut agent = Agent::new(&config(20), Box::new(FixedSource(vec![])), Box::new(Headless));
        agent.poll_once().await;
        assert!(agent.show_next().is_none());
    }

    #[tokio::test]
    async fn test_run_stops_at_flight_limit() {
        let recorder = Recorder::default();
        let source = FixedSource(vec![flight("BAW1"), flight("EZY2"), flight("RYR3")]);
        let agent = Agent::new(&config(2), Box::new(source), Box::new(recorder.clone()));
        let (_tx, rx) = watch::channel(false);

        let stats = tokio::time::timeout(Duration::from_secs(10), agent.run(rx)).await.unwrap();
        assert_eq!(stats.flights_count, 3);
        // boot frame at least
        assert!(*recorder.0.lock().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_run_honours_early_stop() {
        let agent = Agent::new(&config(20), Box::new(FixedSource(vec![flight("BAW1")])), Box::new(Headless));
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let stats = tokio::time::timeout(Duration::from_secs(5), agent.run(rx)).await.unwrap();
        assert_eq!(stats.flights_count, 0);
    }

    /// Keeps its own session, like a backend does.
    #[derive(Default)]
    struct SessionSource {
        reported: Mutex<Vec<String>>,
        stopped: Mutex<bool>,
    }

    #[async_trait]
    impl FlightSource for Arc<SessionSource> {
        async fn current_flights(&self) -> Vec<FlightRecord> {
            vec![flight("BAW1"), flight("EZY2")]
        }

        fn describe(&self) -> String {
            "session".into()
        }

        async fn start_session(&self) -> bool {
            true
        }

        async fn report_flight(&self, flight: &FlightRecord) -> Option<bool> {
            self.reported.lock().unwrap().push(flight.callsign.clone());
            Some(true)
        }

        async fn session_status(&self) -> Option<SessionStatus> {
            let count = self.reported.lock().unwrap().len();
            Some(SessionStatus {
                active: true,
                stats: Some(SessionStats { flights_count: count, ..SessionStats::default() }),
                should_continue: count < 2,
            })
        }

        async fn stop_session(&self) -> Option<SessionStats> {
            *self.stopped.lock().unwrap() = true;
            Some(SessionStats { flights_count: 7, ..SessionStats::default() })
        }
    }

    #[tokio::test]
    async fn test_source_session_drives_the_loop() {
        let source = Arc::new(SessionSource::default());
        // local limit alone would keep going
        let agent = Agent::new(&config(50), Box::new(source.clone()), Box::new(Headless));
        let (_tx, rx) = watch::channel(false);

        let stats = tokio::time::timeout(Duration::from_secs(10), agent.run(rx)).await.unwrap();
        assert_eq!(stats.flights_count, 7);
        assert_eq!(*source.reported.lock().unwrap(), vec!["BAW1", "EZY2"]);
        assert!(*source.stopped.lock().unwrap());
    }

    #[tokio::test]
    async fn test_remote_stats_shown_when_present() {
        let source = Arc::new(SessionSource::default());
        let mut agent = Agent::new(&config(50), Box::new(source), Box::new(Headless));
        agent.start_session().await;
        assert!(agent.should_continue());

        agent.poll_once().await;
        assert_eq!(agent.stats().flights_count, 2);
        assert!(!agent.should_continue());
        assert!(agent.session().should_continue());
    }

    #[test]
    fn test_pbm_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.pbm");
        let mut sink = PbmFile::new(&path);
        sink.show(&FrameBuf::new(8, 1, BinaryColor::On)).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"P4\n8 1\n\xff");
    }
}
