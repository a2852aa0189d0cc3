//! # Link Quality Monitor
//!
//! Per-frame RSSI/SNR, pulled from the transport right after a receive.
//!
//! No averaging or smoothing: each sample replaces the previous one, and the
//! values never influence decoding or routing.

use std::fmt;

use super::SignalReport;

/// Signal metrics of one received frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkQualitySample {
    /// Received signal strength in dBm
    pub rssi_dbm: f32,

    /// Signal-to-noise ratio in dB
    pub snr_db: f32,
}

impl fmt::Display for LinkQualitySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RSSI {:.2} dBm, SNR {:.2} dB", self.rssi_dbm, self.snr_db)
    }
}

/// Holds the sample of the most recently received frame
#[derive(Debug, Default, Clone)]
pub struct LinkQualityMonitor {
    last: Option<LinkQualitySample>,
}

impl LinkQualityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull the metrics of the frame just received and keep them
    ///
    /// A frame without metrics clears the previous sample rather than
    /// inheriting it.
    pub fn sample<L: SignalReport + ?Sized>(&mut self, link: &L) -> Option<LinkQualitySample> {
        self.last = link.last_signal();
        self.last
    }

    /// Sample of the last received frame, if it carried metrics
    pub fn last(&self) -> Option<LinkQualitySample> {
        self.last
    }
}
