//! # Radio Link Module
//!
//! Trait seams between the core and the radio hardware.
//!
//! This module handles:
//! - Receiving single frames with a bounded wait (`RadioLink`)
//! - Reporting per-frame signal metrics (`SignalReport`)
//! - Sending single frames best-effort (`LinkTransmitter`)
//! - Link quality sampling (`quality`)

pub mod quality;

use async_trait::async_trait;

use crate::error::TransportError;
use quality::LinkQualitySample;

/// Receive side of the radio
#[async_trait]
pub trait RadioLink: Send {
    /// Wait for one frame, bounded by the transport's poll window
    ///
    /// `Err(TransportError::Timeout)` is a routine outcome, not a failure.
    async fn receive(&mut self) -> Result<String, TransportError>;
}

/// Signal metrics of the most recently received frame
pub trait SignalReport {
    /// `None` when the transport reported no metrics for that frame
    fn last_signal(&self) -> Option<LinkQualitySample>;
}

/// Send side of the radio
#[async_trait]
pub trait LinkTransmitter: Send {
    /// Send one frame, no acknowledgement or retry
    async fn send(&mut self, frame: &str) -> Result<(), TransportError>;
}
