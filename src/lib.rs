//! # Telemetry Link Library
//!
//! Telemetry link between a rocket tracker and a LoRa ground station.
//!
//! This library provides the telemetry frame protocol (encoding on the
//! tracker, decoding on the ground station), per-frame link quality,
//! great-circle range to the tracker, and the ground station receive loop
//! with JSONL logging and UDP relay.

pub mod config;
pub mod error;
pub mod geo;
pub mod link;
pub mod packet;
pub mod relay;
pub mod serial;
pub mod station;
pub mod telemetry;
pub mod uplink;
