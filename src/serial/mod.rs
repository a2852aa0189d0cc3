//! # Serial Communication Module
//!
//! Handles the USB serial connection to the LoRa radio bridge.
//!
//! This module handles:
//! - Opening the bridge port (8N1) by explicit path or auto-detection
//! - Wrapping the port in a `BridgeLink` bounded by the receive poll window
//! - Parsing the bridge's line protocol (`bridge`)

pub mod bridge;

use std::time::Duration;

use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{Result, TelemetryError};
use bridge::BridgeLink;

/// Port name that selects auto-detection
pub const AUTO_DETECT_PORT: &str = "auto";

/// Default bridge device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (native USB boards)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Bridge link over a real serial port
pub type SerialBridge = BridgeLink<tokio_serial::SerialStream>;

/// Open the radio bridge described by `config`
///
/// # Errors
///
/// Returns error if no device could be opened
pub fn open(config: &SerialConfig) -> Result<(SerialBridge, String)> {
    let poll_window = Duration::from_millis(config.timeout_ms);

    let (port, path) = if config.port == AUTO_DETECT_PORT {
        open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)?
    } else {
        (open_port(&config.port, config.baud_rate)?, config.port.clone())
    };

    Ok((BridgeLink::new(port, poll_window), path))
}

/// Try each path in order and return the first port that opens
///
/// # Arguments
///
/// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
/// * `baud_rate` - Bridge baud rate
pub fn open_with_paths(
    paths: &[&str],
    baud_rate: u32,
) -> Result<(tokio_serial::SerialStream, String)> {
    for path in paths {
        debug!("Trying to open serial port: {}", path);

        match open_port(path, baud_rate) {
            Ok(port) => {
                info!("Successfully opened radio bridge at {}", path);
                return Ok((port, path.to_string()));
            }
            Err(e) => {
                warn!("Failed to open {}: {}", path, e);
                continue;
            }
        }
    }

    Err(TelemetryError::SerialPortNotFound(paths.join(", ")))
}

/// Open a specific serial port with bridge settings (8N1, no flow control)
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| TelemetryError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}
