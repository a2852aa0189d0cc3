//! # Error Types
//!
//! Custom error types for Telemetry Link using `thiserror`.

use thiserror::Error;

/// Reasons a received frame is dropped by the decoder
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame does not have the `[<id>;<fields>]` shape
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Wrong field count or a field that does not parse as its declared type
    #[error("field parse failure for sensor {sensor_id}: {reason}")]
    FieldParseFailure { sensor_id: u32, reason: String },

    /// Sensor identifier with no schema
    #[error("unknown sensor id {0}")]
    UnknownSensorId(u32),
}

/// Caller supplied fields that do not match the sensor schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("unknown sensor id {0}")]
    UnknownSensorId(u32),

    #[error("sensor {sensor_id} expects {expected} fields, got {actual}")]
    ArityMismatch {
        sensor_id: u32,
        expected: usize,
        actual: usize,
    },

    #[error("sensor {sensor_id} field '{label}' has the wrong kind")]
    FieldKindMismatch { sensor_id: u32, label: &'static str },

    #[error("sensor {sensor_id} field '{label}' is not a finite number")]
    NonFiniteField { sensor_id: u32, label: &'static str },
}

/// Outcomes of a radio receive or send other than success
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No frame within the poll window (routine)
    #[error("receive timeout")]
    Timeout,

    /// Non-timeout receive error reported by the radio
    #[error("transport failure (code {0})")]
    Failure(i32),

    /// The underlying stream reached end of file
    #[error("link closed")]
    Closed,

    /// The radio reported that it could not be brought up
    #[error("radio initialization failed: {0}")]
    InitFailed(String),
}

impl TransportError {
    /// Whether the receive loop must stop on this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Closed | TransportError::InitFailed(_))
    }
}

/// Main error type for Telemetry Link
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Frame decoding errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Frame encoding errors
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Radio transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Telemetry record serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Sensor or radio bring-up failure
    #[error("Initialization failure: {0}")]
    Initialization(String),

    /// Coordinates outside -90..90 / -180..180 or not finite
    #[error("Invalid position: latitude {latitude}, longitude {longitude}")]
    InvalidPosition { latitude: f64, longitude: f64 },
}

/// Result type alias for Telemetry Link
pub type Result<T> = std::result::Result<T, TelemetryError>;
