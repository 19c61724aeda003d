/*
 *  config.rs
 *
 *  overhead - what's flying over the house
 *	(c) 2020-26 Stuart Hunter
 *
 *  Configuration: defaults, TOML file, CLI overrides, validation
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

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use dirs_next::home_dir;
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use std::time::Duration;
use thiserror::Error;

/// Error type for config loading/validation/persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Failed to save configuration to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

pub const RADIUS_RANGE: std::ops::RangeInclusive<u32> = 100..=50_000;
pub const MAX_FLIGHTS_RANGE: std::ops::RangeInclusive<u32> = 1..=100;
pub const MAX_ELAPSED_RANGE: std::ops::RangeInclusive<u64> = 60..=7_200;
const PROVIDER_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 5..=30;

pub const DISPLAY_FIELDS: [&str; 5] = ["FROM", "AIRLINE", "MODEL", "REG", "ROUTE"];

/// Top-level app configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub main: MainConfig,
    pub server: ServerConfig,
    pub providers: ProviderConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

/// Tracking parameters, editable at runtime through the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    pub address: String,
    pub search_radius_meters: u32,
    pub max_flights: u32,
    /// seconds
    pub max_elapsed_time: u64,
    pub display_fields: Vec<String>,
    pub use_backend_api: bool,
    pub api_url: String,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            address: "San Francisco, CA".to_string(),
            search_radius_meters: 3000,
            max_flights: 20,
            max_elapsed_time: 1800,
            display_fields: DISPLAY_FIELDS.iter().map(|s| s.to_string()).collect(),
            use_backend_api: true,
            api_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8000".to_string(), request_timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub geocoder_url: String,
    pub flights_url: String,
    pub details_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            geocoder_url: "https://nominatim.openstreetmap.org/search".to_string(),
            flights_url: "https://data-cloud.flightradar24.com/zones/fcgi/feed.js".to_string(),
            details_url: "https://data-live.flightradar24.com/clickhandler/".to_string(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

impl ProviderConfig {
    /// Outbound timeout, held to 5..=30 seconds whatever the file says.
    pub fn timeout(&self) -> Duration {
        let secs = self.timeout_secs.clamp(*PROVIDER_TIMEOUT_RANGE.start(), *PROVIDER_TIMEOUT_RANGE.end());
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub boot_screen_duration: u64,
    pub flight_rotation_interval: u64,
    pub fetch_interval: u64,
    pub width: u32,
    pub height: u32,
    pub rotate: bool,
    /// Development display: each frame is written here as PBM.
    pub output: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            boot_screen_duration: 10,
            flight_rotation_interval: 5,
            fetch_interval: 10,
            width: 250,
            height: 122,
            rotate: true,
            output: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub max_activities: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), max_activities: 500 }
    }
}

/// CLI overrides, layered over the TOML file.
#[derive(Debug, Parser, Clone)]
#[command(name = "overhead", version, about = "Tracks the flights passing over an address")]
pub struct Cli {
    /// Path to a TOML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Debug logging
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub address: Option<String>,
    /// Search radius, meters
    #[arg(long)]
    pub radius: Option<u32>,
    #[arg(long)]
    pub max_flights: Option<u32>,
    /// Session length limit, seconds
    #[arg(long)]
    pub max_elapsed: Option<u64>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run the display agent
    Agent {
        /// Query the flight provider directly instead of the backend API
        #[arg(long, action = ArgAction::SetTrue)]
        standalone: bool,
        /// Write frames to this PBM file
        #[arg(long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        #[arg(long)]
        api_url: Option<String>,
    },
}

/// The effective configuration and where it came from.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub config: AppConfig,
    pub path: PathBuf,
    /// false when no file was found and defaults were used
    pub from_file: bool,
}

/// Layer defaults, file and CLI; validate the result.
pub fn load(cli: &Cli) -> Result<Loaded, ConfigError> {
    let (path, explicit) = match cli.config.as_ref() {
        Some(p) => (p.clone(), true),
        None => (find_config_file().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)), false),
    };

    let (mut config, from_file) = if path.exists() {
        (read_toml(&path)?, true)
    } else if explicit {
        return Err(ConfigError::Validation(format!(
            "Config file not found: {}",
            path.display()
        )));
    } else {
        (AppConfig::default(), false)
    };

    apply_cli_overrides(&mut config, cli);
    validate(&config)?;

    Ok(Loaded { config, path, from_file })
}

/// Try common locations in order (first hit wins).
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/overhead/config.toml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/overhead.toml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["overhead.toml", DEFAULT_CONFIG_FILE, "config/overhead.toml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_toml(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&s)?;
    Ok(cfg)
}

pub fn to_toml(cfg: &AppConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

pub fn apply_cli_overrides(cfg: &mut AppConfig, cli: &Cli) {
    if let Some(a) = cli.address.as_ref()  { cfg.main.address = a.clone(); }
    if let Some(r) = cli.radius            { cfg.main.search_radius_meters = r; }
    if let Some(m) = cli.max_flights       { cfg.main.max_flights = m; }
    if let Some(e) = cli.max_elapsed       { cfg.main.max_elapsed_time = e; }
    if cli.debug                           { cfg.logging.level = "debug".to_string(); }

    match cli.command.as_ref() {
        Some(Command::Serve { bind: Some(b) }) => cfg.server.bind = b.clone(),
        Some(Command::Agent { standalone, output, api_url }) => {
            if *standalone { cfg.main.use_backend_api = false; }
            if output.is_some() { cfg.ui.output = output.clone(); }
            if let Some(u) = api_url { cfg.main.api_url = u.clone(); }
        }
        _ => {}
    }
}

/// Range checks on the tracking parameters; the rest just needs to be usable.
pub fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    let m = &cfg.main;
    if m.address.trim().is_empty() {
        return Err(ConfigError::Validation("address must not be empty".into()));
    }
    if !RADIUS_RANGE.contains(&m.search_radius_meters) {
        return Err(ConfigError::Validation(format!(
            "search_radius_meters must be {}..={}, got {}",
            RADIUS_RANGE.start(), RADIUS_RANGE.end(), m.search_radius_meters
        )));
    }
    if !MAX_FLIGHTS_RANGE.contains(&m.max_flights) {
        return Err(ConfigError::Validation(format!(
            "max_flights must be {}..={}, got {}",
            MAX_FLIGHTS_RANGE.start(), MAX_FLIGHTS_RANGE.end(), m.max_flights
        )));
    }
    if !MAX_ELAPSED_RANGE.contains(&m.max_elapsed_time) {
        return Err(ConfigError::Validation(format!(
            "max_elapsed_time must be {}..={}, got {}",
            MAX_ELAPSED_RANGE.start(), MAX_ELAPSED_RANGE.end(), m.max_elapsed_time
        )));
    }
    if let Some(f) = m.display_fields.iter().find(|f| !DISPLAY_FIELDS.contains(&f.as_str())) {
        return Err(ConfigError::Validation(format!("unknown display field '{}'", f)));
    }
    if cfg.ui.width == 0 || cfg.ui.height == 0 {
        return Err(ConfigError::Validation("ui width/height must be > 0".into()));
    }
    if cfg.ui.fetch_interval == 0 || cfg.ui.flight_rotation_interval == 0 {
        return Err(ConfigError::Validation("ui intervals must be > 0".into()));
    }
    Ok(())
}

/// Partial update of the `[main]` section; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub address: Option<String>,
    pub search_radius_meters: Option<u32>,
    pub max_flights: Option<u32>,
    pub max_elapsed_time: Option<u64>,
    pub display_fields: Option<Vec<String>>,
}

/// What an update actually changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigChanges {
    pub updated: Vec<&'static str>,
    pub address_changed: bool,
}

impl ConfigChanges {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
    }
}

/// The config document plus the file it is persisted to.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: AppConfig) -> Self {
        Self { path: path.into(), config }
    }

    /// Read `path`, or start from defaults when it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = if path.exists() { read_toml(&path)? } else { AppConfig::default() };
        validate(&config)?;
        Ok(Self { path, config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let s = to_toml(&self.config)?;
        fs::write(&self.path, s).map_err(|source| ConfigError::Persist {
            path: self.path.clone(),
            source,
        })
    }

    /// Apply, validate and persist. On any failure the stored document is
    /// left as it was.
    pub fn update(&mut self, update: &ConfigUpdate) -> Result<ConfigChanges, ConfigError> {
        let mut next = self.config.clone();
        let mut changes = ConfigChanges::default();
        let m = &mut next.main;

        if let Some(a) = update.address.as_ref() {
            if *a != m.address {
                m.address = a.clone();
                changes.address_changed = true;
            }
            changes.updated.push("address");
        }
        if let Some(r) = update.search_radius_meters {
            m.search_radius_meters = r;
            changes.updated.push("search_radius_meters");
        }
        if let Some(f) = update.max_flights {
            m.max_flights = f;
            changes.updated.push("max_flights");
        }
        if let Some(e) = update.max_elapsed_time {
            m.max_elapsed_time = e;
            changes.updated.push("max_elapsed_time");
        }
        if let Some(d) = update.display_fields.as_ref() {
            m.display_fields = d.clone();
            changes.updated.push("display_fields");
        }

        validate(&next)?;

        let previous = std::mem::replace(&mut self.config, next);
        if let Err(e) = self.save() {
            self.config = previous;
            return Err(e);
        }
        info!("Configuration updated: {}", changes.updated.join(", "));
        Ok(changes)
    }
}
