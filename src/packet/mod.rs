//! # Telemetry Packet Protocol
//!
//! Text framing used between the tracker and the ground station.
//!
//! This module handles:
//! - Sensor id → field schema table (GNSS, barometer, IMU, humidity)
//! - Frame encoding with per-sensor decimal precision
//! - Frame decoding, demultiplexing and validation

pub mod protocol;
pub mod encoder;
pub mod decoder;
