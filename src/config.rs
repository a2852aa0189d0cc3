//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, TelemetryError};
use crate::geo::Position;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub station: StationConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Radio bridge serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path, or "auto" to probe the usual USB paths
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Receive poll window
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Ground station features and own position
#[derive(Debug, Deserialize, Clone)]
pub struct StationConfig {
    #[serde(default = "default_distance_enabled")]
    pub distance_enabled: bool,

    #[serde(default)]
    pub relay_enabled: bool,

    /// Surveyed station latitude in degrees
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Surveyed station longitude in degrees
    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default = "default_stats_interval_ticks")]
    pub stats_interval_ticks: u64,
}

/// UDP broadcast relay configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    #[serde(default = "default_relay_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_relay_target_addr")]
    pub target_addr: String,
}

/// Telemetry log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_serial_port() -> String { "auto".to_string() }
fn default_baud_rate() -> u32 { 9600 }
fn default_timeout_ms() -> u64 { 2000 }

fn default_distance_enabled() -> bool { true }
fn default_stats_interval_ticks() -> u64 { 100 }

fn default_relay_bind_addr() -> String { "0.0.0.0:0".to_string() }
fn default_relay_target_addr() -> String { "255.255.255.255:4210".to_string() }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            distance_enabled: default_distance_enabled(),
            relay_enabled: false,
            latitude: None,
            longitude: None,
            stats_interval_ticks: default_stats_interval_ticks(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_relay_bind_addr(),
            target_addr: default_relay_target_addr(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            station: StationConfig::default(),
            relay: RelayConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use telemetry_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Surveyed station position, if configured
    ///
    /// # Errors
    ///
    /// Returns error if only one coordinate is set or the pair is out of range
    pub fn station_position(&self) -> Result<Option<Position>> {
        match (self.station.latitude, self.station.longitude) {
            (Some(latitude), Some(longitude)) => Position::new(latitude, longitude).map(Some),
            (None, None) => Ok(None),
            _ => Err(invalid("station latitude and longitude must be set together")),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 19200, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 19200, 57600, 115200"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 60000 {
            return Err(invalid("timeout_ms must be between 1 and 60000"));
        }

        if self.station.stats_interval_ticks == 0 {
            return Err(invalid("stats_interval_ticks must be greater than 0"));
        }

        self.station_position()
            .map_err(|_| invalid("station latitude/longitude must both be set and in range"))?;

        if self.station.relay_enabled {
            for (name, addr) in [
                ("bind_addr", &self.relay.bind_addr),
                ("target_addr", &self.relay.target_addr),
            ] {
                if addr.parse::<SocketAddr>().is_err() {
                    return Err(invalid(format!("relay {} '{}' is not a socket address", name, addr)));
                }
            }
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        Ok(())
    }
}
