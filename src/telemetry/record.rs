//! Telemetry log record: one decoded frame plus receive context.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::link::quality::LinkQualitySample;
use crate::packet::protocol::DecodedFrame;

/// One JSON Lines entry
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    /// Receive time, RFC 3339
    pub timestamp: String,
    pub sensor_id: u32,
    pub sensor: &'static str,

    /// Schema label → value
    pub fields: Map<String, Value>,

    /// Frame exactly as received
    pub raw: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi_dbm: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snr_db: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing_deg: Option<f64>,
}

impl TelemetryRecord {
    pub fn new(frame: &DecodedFrame, raw: &str, signal: Option<LinkQualitySample>) -> Self {
        let id = frame.reading.sensor_id();
        let schema = id.schema();

        let fields = schema
            .fields
            .iter()
            .zip(frame.reading.fields())
            .map(|(spec, value)| (spec.label.to_string(), Value::from(value.as_f64())))
            .collect();

        Self {
            timestamp: frame.received_at.to_rfc3339(),
            sensor_id: id.wire_id(),
            sensor: schema.name,
            fields,
            raw: raw.to_string(),
            rssi_dbm: signal.map(|s| s.rssi_dbm),
            snr_db: signal.map(|s| s.snr_db),
            distance_m: None,
            bearing_deg: None,
        }
    }

    /// Attach the distance/bearing from the station to the tracker
    pub fn with_range(mut self, distance_m: Option<f64>, bearing_deg: Option<f64>) -> Self {
        self.distance_m = distance_m;
        self.bearing_deg = bearing_deg;
        self
    }
}
