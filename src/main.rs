//! # Telemetry Link Ground Station
//!
//! Receives telemetry frames from the rocket tracker through a LoRa radio
//! bridge, decodes them, tracks range to the tracker, logs and relays.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use telemetry_link::config::Config;
use telemetry_link::relay::UdpRelay;
use telemetry_link::serial;
use telemetry_link::station::{FixedPosition, GroundStation, StationFeatures};
use telemetry_link::telemetry::TelemetryLogger;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the ground station
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (first argument, or `config/default.toml`)
///    - Open the radio bridge serial port
///    - Bind the relay socket and open the telemetry log if enabled
///
/// 2. **Main Loop**
///    - One `tick` per iteration: poll own fix, receive, decode, range, log, relay
///    - Handle Ctrl+C for graceful shutdown
///
/// Any initialization failure, or the radio link closing, ends the process
/// with an error. There is no restart policy.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Telemetry Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let (link, path) = serial::open(&config.serial).context("radio bridge initialization failed")?;
    info!("Radio bridge opened at: {} ({} baud)", path, config.serial.baud_rate);

    let features = StationFeatures {
        distance: config.station.distance_enabled,
        relay: config.station.relay_enabled,
    };

    let mut station = GroundStation::new(link, features)
        .with_stats_interval(config.station.stats_interval_ticks);

    if let Some(position) = config.station_position()? {
        station = station.with_position_source(Box::new(FixedPosition(position)));
    } else if features.distance {
        warn!("No station position configured, distance to tracker is disabled");
    }

    if features.relay {
        let relay = UdpRelay::bind(&config.relay).await.context("relay initialization failed")?;
        station = station.with_relay(Box::new(relay));
    }

    if config.telemetry.enabled {
        let logger = TelemetryLogger::new(&config.telemetry).context("telemetry log initialization failed")?;
        station = station.with_logger(logger);
    }

    info!("Listening for telemetry (poll window {} ms)", config.serial.timeout_ms);
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            outcome = station.tick() => {
                if let Err(e) = outcome {
                    error!("Stopping: {}", e);
                    info!("Final status: {}", station.stats());
                    return Err(e.into());
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Final status: {}", station.stats());
                break;
            }
        }
    }

    Ok(())
}

/// Load the configuration named on the command line
///
/// A missing default file falls back to built-in defaults; a missing file
/// named explicitly is an error.
fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("failed to load configuration from {}", path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("failed to load configuration from {}", DEFAULT_CONFIG_PATH)),
        None => {
            warn!("{} not found, using built-in defaults", DEFAULT_CONFIG_PATH);
            Ok(Config::default())
        }
    }
}
