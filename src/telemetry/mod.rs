//! # Telemetry Module
//!
//! Handles telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - Building one record per decoded frame (fields, RSSI/SNR, range)
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files

pub mod logger;
pub mod record;

pub use logger::TelemetryLogger;
pub use record::TelemetryRecord;
