/*
 *  main.rs
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

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

use overhead::agent::{Agent, sink_from_config};
use overhead::config::{self, Cli, Command, ConfigStore};
use overhead::server::{self, AppContext};
use overhead::tracker::{FlightTrackerService, source_from_config};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP, logs which one, and returns.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// Flip `stop` once a termination signal arrives.
fn spawn_stop_on_signal() -> watch::Receiver<bool> {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = signal_handler().await {
            error!("Failed to install signal handlers: {}", e);
            return;
        }
        let _ = stop_tx.send(true);
    });
    stop_rx
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = config::load(&cli)?;
    let cfg = loaded.config;

    if cli.dump_config {
        println!("{}", config::to_toml(&cfg)?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.logging.level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("This is {} watching the skies", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    if loaded.from_file {
        info!("Configuration loaded from {}", loaded.path.display());
    } else {
        warn!("No config file at {}, using defaults", loaded.path.display());
    }

    match cli.command.clone().unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { .. } => {
            let tracker = FlightTrackerService::from_config(&cfg.providers)?;
            let store = ConfigStore::new(loaded.path, cfg);
            let ctx = Arc::new(AppContext::new(store, tracker));

            let mut stop = spawn_stop_on_signal();
            server::serve(ctx, async move {
                let _ = stop.wait_for(|s| *s).await;
            })
            .await?;
        }
        Command::Agent { .. } => {
            let source = source_from_config(&cfg)?;
            let sink = sink_from_config(&cfg.ui);
            let agent = Agent::new(&cfg, source, sink);

            let stats = agent.run(spawn_stop_on_signal()).await;
            info!("Tracked {} flight(s) in {}", stats.flights_count, stats.elapsed_str);
        }
    }

    info!("Main application exiting.");
    Ok(())
}
