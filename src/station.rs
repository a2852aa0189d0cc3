//! # Ground Station
//!
//! The receive loop core: one `tick` polls the station's own position,
//! attempts one bounded receive, decodes at most one frame, updates link
//! quality and range to the tracker, then logs and optionally relays.
//!
//! Every per-frame problem (timeout, radio error, undecodable frame) is
//! handled inside the tick and the next tick is the retry. Only a closed or
//! uninitialized radio ends the loop.

use std::fmt;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::error::{DecodeError, Result, TransportError};
use crate::geo::{GeolocationTracker, Position};
use crate::link::quality::{LinkQualityMonitor, LinkQualitySample};
use crate::link::{RadioLink, SignalReport};
use crate::packet::decoder::decode_frame;
use crate::packet::protocol::{DecodedFrame, GnssFix, SensorReading};
use crate::relay::RelayForwarder;
use crate::telemetry::{TelemetryLogger, TelemetryRecord};

/// Default number of ticks between status log lines
pub const DEFAULT_STATS_INTERVAL_TICKS: u64 = 100;

/// Source of the station's own GNSS fix
#[cfg_attr(test, mockall::automock)]
pub trait PositionSource: Send {
    /// Latest fix, or `None` if no fix is available this tick
    fn poll_fix(&mut self) -> Option<Position>;
}

/// Surveyed position of a stationary ground station
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

impl PositionSource for FixedPosition {
    fn poll_fix(&mut self) -> Option<Position> {
        Some(self.0)
    }
}

/// Optional stages of the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationFeatures {
    /// Compute distance/bearing for GNSS frames
    pub distance: bool,
    /// Forward every decoded frame to the relay
    pub relay: bool,
}

impl Default for StationFeatures {
    fn default() -> Self {
        Self { distance: true, relay: false }
    }
}

/// Counters since start-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StationStats {
    pub ticks: u64,
    pub received: u64,
    pub decoded: u64,
    pub dropped: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub relayed: u64,
}

impl fmt::Display for StationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks, {} received, {} decoded, {} dropped, {} timeouts, {} failures, {} relayed",
            self.ticks, self.received, self.decoded, self.dropped, self.timeouts, self.failures, self.relayed
        )
    }
}

/// A frame that made it through decoding
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedTelemetry {
    pub frame: DecodedFrame,
    /// Frame text as received
    pub raw: String,
    /// Metrics the transport reported for this frame, if any
    pub signal: Option<LinkQualitySample>,
    /// Meters from the station, GNSS frames with a station fix only
    pub distance_m: Option<f64>,
    /// Degrees from the station, GNSS frames with a station fix only
    pub bearing_deg: Option<f64>,
    pub relayed: bool,
}

impl fmt::Display for ReceivedTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.frame.received_at.with_timezone(&Local).format("%H:%M:%S%.3f");
        write!(f, "[{}] {}", time, self.frame.reading)?;

        match self.signal {
            Some(signal) => write!(f, " | {}", signal)?,
            None => write!(f, " | no signal report")?,
        }

        if let Some(distance) = self.distance_m {
            write!(f, " | distance {:.1} m", distance)?;
        }
        if let Some(bearing) = self.bearing_deg {
            write!(f, " bearing {:.1}°", bearing)?;
        }

        Ok(())
    }
}

/// Result of one tick that did not stop the loop
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing arrived in the poll window
    Timeout,
    /// The radio reported a receive error with this code
    TransportFailure(i32),
    /// A frame arrived but could not be decoded
    Dropped(DecodeError),
    Received(ReceivedTelemetry),
}

/// Ground station receive loop state
pub struct GroundStation<L> {
    link: L,
    features: StationFeatures,
    quality: LinkQualityMonitor,
    geo: GeolocationTracker,
    position_source: Option<Box<dyn PositionSource>>,
    relay: Option<Box<dyn RelayForwarder>>,
    logger: Option<TelemetryLogger>,
    stats: StationStats,
    stats_interval_ticks: u64,
}

impl<L> fmt::Debug for GroundStation<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroundStation")
            .field("features", &self.features)
            .field("has_fix", &self.geo.has_fix())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<L: RadioLink + SignalReport> GroundStation<L> {
    pub fn new(link: L, features: StationFeatures) -> Self {
        Self {
            link,
            features,
            quality: LinkQualityMonitor::new(),
            geo: GeolocationTracker::new(),
            position_source: None,
            relay: None,
            logger: None,
            stats: StationStats::default(),
            stats_interval_ticks: DEFAULT_STATS_INTERVAL_TICKS,
        }
    }

    /// Poll `source` for the station's own fix at the start of every tick
    pub fn with_position_source(mut self, source: Box<dyn PositionSource>) -> Self {
        self.position_source = Some(source);
        self
    }

    /// Forward decoded frames to `relay` (when the relay feature is on)
    pub fn with_relay(mut self, relay: Box<dyn RelayForwarder>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Write every decoded frame to `logger`
    pub fn with_logger(mut self, logger: TelemetryLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_stats_interval(mut self, ticks: u64) -> Self {
        self.stats_interval_ticks = ticks.max(1);
        self
    }

    pub fn stats(&self) -> StationStats {
        self.stats
    }

    pub fn geolocation(&self) -> &GeolocationTracker {
        &self.geo
    }

    pub fn link_quality(&self) -> &LinkQualityMonitor {
        &self.quality
    }

    /// Run one iteration of the receive loop
    ///
    /// # Errors
    ///
    /// Returns error only when the radio link is closed or failed to
    /// initialize; every other outcome is reported through `TickOutcome`.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        self.stats.ticks += 1;
        self.poll_position();

        let outcome = match self.link.receive().await {
            Ok(raw) => self.process(raw).await,
            Err(e) => self.on_transport_error(e)?,
        };

        if self.stats.ticks % self.stats_interval_ticks == 0 {
            info!("Station status: {}", self.stats);
        }

        Ok(outcome)
    }

    fn poll_position(&mut self) {
        if let Some(position) = self.position_source.as_mut().and_then(|s| s.poll_fix()) {
            if !self.geo.has_fix() {
                info!(
                    "Station fix acquired: {:.7}, {:.7}",
                    position.latitude, position.longitude
                );
            }
            self.geo.update_self(position);
        }
    }

    fn on_transport_error(&mut self, error: TransportError) -> Result<TickOutcome> {
        match error {
            TransportError::Timeout => {
                self.stats.timeouts += 1;
                debug!("No packet received, RX timeout");
                Ok(TickOutcome::Timeout)
            }
            TransportError::Failure(code) => {
                self.stats.failures += 1;
                warn!("Receive failed, error code: {}", code);
                Ok(TickOutcome::TransportFailure(code))
            }
            fatal @ (TransportError::Closed | TransportError::InitFailed(_)) => {
                error!("Radio link unusable: {}", fatal);
                Err(fatal.into())
            }
        }
    }

    async fn process(&mut self, raw: String) -> TickOutcome {
        self.stats.received += 1;
        let signal = self.quality.sample(&self.link);

        let frame = match decode_frame(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.dropped += 1;
                match e {
                    DecodeError::UnknownSensorId(_) => debug!("Dropped frame '{}': {}", raw, e),
                    _ => match signal {
                        Some(signal) => warn!("Dropped frame '{}': {} ({})", raw, e, signal),
                        None => warn!("Dropped frame '{}': {}", raw, e),
                    },
                }
                return TickOutcome::Dropped(e);
            }
        };
        self.stats.decoded += 1;

        let (distance_m, bearing_deg) = match frame.reading {
            SensorReading::Gnss(fix) if self.features.distance => self.range_to(&fix),
            _ => (None, None),
        };

        if let Some(logger) = self.logger.as_mut() {
            let record = TelemetryRecord::new(&frame, &raw, signal).with_range(distance_m, bearing_deg);
            if let Err(e) = logger.log(&record) {
                warn!("Failed to write telemetry record: {}", e);
            }
        }

        let relayed = self.relay_frame(&raw).await;

        let received = ReceivedTelemetry {
            frame,
            raw,
            signal,
            distance_m,
            bearing_deg,
            relayed,
        };
        info!("{}", received);

        TickOutcome::Received(received)
    }

    /// Distance and bearing from the station to the tracker's fix
    fn range_to(&self, fix: &GnssFix) -> (Option<f64>, Option<f64>) {
        if !self.geo.has_fix() {
            debug!("No station fix yet, skipping distance");
            return (None, None);
        }

        match fix.position() {
            Ok(remote) => (self.geo.distance_to(&remote), self.geo.bearing_to(&remote)),
            Err(e) => {
                warn!("Tracker GNSS fix rejected: {}", e);
                (None, None)
            }
        }
    }

    async fn relay_frame(&mut self, raw: &str) -> bool {
        if !self.features.relay {
            return false;
        }

        let Some(relay) = self.relay.as_mut() else {
            return false;
        };

        match relay.forward(raw).await {
            Ok(()) => {
                self.stats.relayed += 1;
                true
            }
            Err(e) => {
                warn!("Relay failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TelemetryError;
    use crate::link::mocks::MockRadio;
    use crate::relay::mocks::MockRelay;

    fn station_at(radio: &MockRadio, features: StationFeatures, lat: f64, lon: f64) -> GroundStation<MockRadio> {
        let position = Position::new(lat, lon).unwrap();
        GroundStation::new(radio.clone(), features)
            .with_position_source(Box::new(FixedPosition(position)))
    }

    #[tokio::test]
    async fn test_tick_decodes_frame_with_signal() {
        let radio = MockRadio::new();
        radio.push_frame("[2;101.32,22.50,15.00]", -87.5, 9.25);
        let mut station = GroundStation::new(radio.clone(), StationFeatures::default());

        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => {
                assert!(matches!(received.frame.reading, SensorReading::Barometric(_)));
                assert_eq!(received.signal, Some(LinkQualitySample { rssi_dbm: -87.5, snr_db: 9.25 }));
                assert_eq!(received.distance_m, None);
                assert!(!received.relayed);
            }
            other => panic!("Expected Received, got: {:?}", other),
        }

        assert_eq!(station.link_quality().last().unwrap().rssi_dbm, -87.5);
        assert_eq!(station.stats().decoded, 1);
    }

    #[tokio::test]
    async fn test_frame_without_metrics_does_not_inherit_previous_signal() {
        let radio = MockRadio::new();
        radio.push_frame("[6;21.50,40.00]", -40.0, 12.0);
        radio.push_frame_without_signal("[6;22.00,41.00]");
        let mut station = GroundStation::new(radio.clone(), StationFeatures::default());

        station.tick().await.unwrap();
        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => {
                assert_eq!(received.signal, None);
                assert!(received.to_string().contains("no signal report"));
            }
            other => panic!("Expected Received, got: {:?}", other),
        }

        assert_eq!(station.link_quality().last(), None);
    }

    #[tokio::test]
    async fn test_gnss_frame_distance_from_station() {
        let radio = MockRadio::new();
        radio.push_frame("[1;340010000,-1180000000,8]", -70.0, 10.0);
        let mut station = station_at(&radio, StationFeatures::default(), 34.0, -118.0);

        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => {
                let distance = received.distance_m.unwrap();
                assert!((distance - 111.2).abs() < 0.1, "got {}", distance);
                let bearing = received.bearing_deg.unwrap();
                assert!(bearing < 1.0 || bearing > 359.0, "got {}", bearing);
            }
            other => panic!("Expected Received, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_distance_without_station_fix() {
        let radio = MockRadio::new();
        radio.push_frame("[1;340010000,-1180000000,8]", -70.0, 10.0);

        let mut source = MockPositionSource::new();
        source.expect_poll_fix().times(1).returning(|| None);

        let mut station = GroundStation::new(radio.clone(), StationFeatures::default())
            .with_position_source(Box::new(source));

        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => assert_eq!(received.distance_m, None),
            other => panic!("Expected Received, got: {:?}", other),
        }
        assert!(!station.geolocation().has_fix());
    }

    #[tokio::test]
    async fn test_position_source_polled_every_tick() {
        let radio = MockRadio::new();

        let mut source = MockPositionSource::new();
        let fix = Position::new(10.0, 20.0).unwrap();
        source.expect_poll_fix().times(3).returning(move || Some(fix));

        let mut station = GroundStation::new(radio.clone(), StationFeatures::default())
            .with_position_source(Box::new(source));

        for _ in 0..3 {
            assert_eq!(station.tick().await.unwrap(), TickOutcome::Timeout);
        }
        assert_eq!(station.geolocation().self_position(), Some(fix));
    }

    #[tokio::test]
    async fn test_distance_feature_disabled() {
        let radio = MockRadio::new();
        radio.push_frame("[1;340010000,-1180000000,8]", -70.0, 10.0);
        let features = StationFeatures { distance: false, relay: false };
        let mut station = station_at(&radio, features, 34.0, -118.0);

        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => assert_eq!(received.distance_m, None),
            other => panic!("Expected Received, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_tracker_fix_skips_distance() {
        let radio = MockRadio::new();
        radio.push_frame("[1;950000000,0,4]", -70.0, 10.0);
        let mut station = station_at(&radio, StationFeatures::default(), 34.0, -118.0);

        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => assert_eq!(received.distance_m, None),
            other => panic!("Expected Received, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_sensor_dropped_and_loop_continues() {
        let radio = MockRadio::new();
        radio.push_frame("[42;1.00,2.00,3.00]", -90.0, 2.0);
        radio.push_frame("[6;21.50,40.00]", -88.0, 3.0);
        let mut station = GroundStation::new(radio.clone(), StationFeatures::default());

        assert_eq!(
            station.tick().await.unwrap(),
            TickOutcome::Dropped(DecodeError::UnknownSensorId(42))
        );
        assert!(matches!(station.tick().await.unwrap(), TickOutcome::Received(_)));

        let stats = station.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.decoded, 1);
    }

    #[tokio::test]
    async fn test_timeout_and_failure_are_recovered() {
        let radio = MockRadio::new();
        radio.push_error(TransportError::Timeout);
        radio.push_error(TransportError::Failure(-7));
        radio.push_frame("[6;21.50,40.00]", -88.0, 3.0);
        let mut station = GroundStation::new(radio.clone(), StationFeatures::default());

        assert_eq!(station.tick().await.unwrap(), TickOutcome::Timeout);
        assert_eq!(station.tick().await.unwrap(), TickOutcome::TransportFailure(-7));
        assert!(matches!(station.tick().await.unwrap(), TickOutcome::Received(_)));

        let stats = station.stats();
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.ticks, 3);
    }

    #[tokio::test]
    async fn test_closed_link_is_fatal() {
        let radio = MockRadio::new();
        radio.push_error(TransportError::Closed);
        let mut station = GroundStation::new(radio.clone(), StationFeatures::default());

        assert!(matches!(
            station.tick().await,
            Err(TelemetryError::Transport(TransportError::Closed))
        ));
    }

    #[tokio::test]
    async fn test_relay_forwards_raw_frame() {
        let radio = MockRadio::new();
        radio.push_frame("[3;-9.807,0.000,0.125]", -80.0, 5.0);
        radio.push_frame("[3;bad]", -80.0, 5.0);

        let relay = MockRelay::new();
        let features = StationFeatures { distance: true, relay: true };
        let mut station = GroundStation::new(radio.clone(), features).with_relay(Box::new(relay.clone()));

        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => assert!(received.relayed),
            other => panic!("Expected Received, got: {:?}", other),
        }
        station.tick().await.unwrap();

        assert_eq!(relay.get_forwarded(), vec!["[3;-9.807,0.000,0.125]".to_string()]);
        assert_eq!(station.stats().relayed, 1);
    }

    #[tokio::test]
    async fn test_relay_disabled_by_feature() {
        let radio = MockRadio::new();
        radio.push_frame("[6;21.50,40.00]", -88.0, 3.0);

        let relay = MockRelay::new();
        let mut station = GroundStation::new(radio.clone(), StationFeatures::default())
            .with_relay(Box::new(relay.clone()));

        station.tick().await.unwrap();
        assert!(relay.get_forwarded().is_empty());
    }

    #[tokio::test]
    async fn test_relay_failure_does_not_abort_tick() {
        let radio = MockRadio::new();
        radio.push_frame("[6;21.50,40.00]", -88.0, 3.0);

        let relay = MockRelay::new();
        relay.set_fail(true);
        let features = StationFeatures { distance: true, relay: true };
        let mut station = GroundStation::new(radio.clone(), features).with_relay(Box::new(relay));

        match station.tick().await.unwrap() {
            TickOutcome::Received(received) => assert!(!received.relayed),
            other => panic!("Expected Received, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decoded_frames_are_logged() {
        use crate::config::TelemetryConfig;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let logger = TelemetryLogger::new(&TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().to_string(),
            max_records_per_file: 100,
            max_files_to_keep: 5,
            format: "jsonl".to_string(),
        })
        .unwrap();

        let radio = MockRadio::new();
        radio.push_frame("[1;340010000,-1180000000,8]", -70.0, 10.0);
        radio.push_frame("[99;1,2,3]", -70.0, 10.0);
        let mut station = station_at(&radio, StationFeatures::default(), 34.0, -118.0).with_logger(logger);

        station.tick().await.unwrap();
        station.tick().await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let contents = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["sensor"], "GNSS");
        assert_eq!(record["rssi_dbm"], -70.0);
        assert!(record["distance_m"].as_f64().unwrap() > 111.0);
    }

    #[test]
    fn test_received_telemetry_display() {
        let frame = decode_frame("[1;340010000,-1180000000,8]").unwrap();
        let received = ReceivedTelemetry {
            frame,
            raw: "[1;340010000,-1180000000,8]".to_string(),
            signal: Some(LinkQualitySample { rssi_dbm: -70.0, snr_db: 10.0 }),
            distance_m: Some(111.19),
            bearing_deg: Some(0.0),
            relayed: false,
        };

        let line = received.to_string();
        assert!(line.contains("GNSS: Latitude=340010000 Longitude=-1180000000 SIV=8"));
        assert!(line.contains("RSSI -70.00 dBm, SNR 10.00 dB"));
        assert!(line.contains("distance 111.2 m"));
    }

    #[test]
    fn test_stats_display() {
        let stats = StationStats { ticks: 3, received: 2, decoded: 1, dropped: 1, ..Default::default() };
        assert_eq!(
            stats.to_string(),
            "3 ticks, 2 received, 1 decoded, 1 dropped, 0 timeouts, 0 failures, 0 relayed"
        );
    }
}
