//! # Tracker Uplink
//!
//! Tracker-side pipeline: sample every sensor, encode each reading as one
//! frame and hand it to the radio. Sends are best-effort; a failed frame is
//! logged and dropped, and the next sampling pass carries fresh data.

use tracing::{debug, warn};

use crate::link::LinkTransmitter;
use crate::packet::encoder::encode_reading;
use crate::packet::protocol::SensorReading;

/// Source of sensor readings (GNSS, barometer, IMU, humidity drivers)
pub trait SensorSampler: Send {
    /// Readings available in this sampling pass, in transmit order
    fn sample(&mut self) -> Vec<SensorReading>;
}

/// Counters for one uplink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UplinkStats {
    pub sent: u64,
    pub failed: u64,
}

/// Encodes sampled readings and sends them over a transmitter
#[derive(Debug)]
pub struct Uplink<S, T> {
    sampler: S,
    transmitter: T,
    stats: UplinkStats,
}

impl<S: SensorSampler, T: LinkTransmitter> Uplink<S, T> {
    pub fn new(sampler: S, transmitter: T) -> Self {
        Self {
            sampler,
            transmitter,
            stats: UplinkStats::default(),
        }
    }

    /// Sample once and send one frame per reading
    ///
    /// Returns the number of frames sent successfully in this pass.
    pub async fn pass(&mut self) -> usize {
        let mut sent = 0;

        for reading in self.sampler.sample() {
            let frame = match encode_reading(&reading) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping {} reading: {}", reading.sensor_id(), e);
                    self.stats.failed += 1;
                    continue;
                }
            };

            match self.transmitter.send(&frame).await {
                Ok(()) => {
                    debug!("Sent packet: {}", frame);
                    self.stats.sent += 1;
                    sent += 1;
                }
                Err(e) => {
                    warn!("Failed to send {} frame: {}", reading.sensor_id(), e);
                    self.stats.failed += 1;
                }
            }
        }

        sent
    }

    pub fn stats(&self) -> UplinkStats {
        self.stats
    }
}
