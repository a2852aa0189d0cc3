//! # Telemetry Frame Constants and Types
//!
//! Core protocol definitions for the tracker → ground station text frames.
//!
//! Wire format: `[<sensor id>;<field 1>,<field 2>,...,<field N>]`. There is no
//! checksum and no length prefix; the radio layer drops corrupted packets
//! before they reach the decoder.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::geo::Position;

/// Frame start delimiter
pub const FRAME_START: char = '[';

/// Frame end delimiter
pub const FRAME_END: char = ']';

/// Separator between the sensor id and the field list
pub const ID_SEPARATOR: char = ';';

/// Separator between fields
pub const FIELD_SEPARATOR: char = ',';

/// u-blox raw coordinate scale (degrees × 10^7)
pub const GNSS_COORDINATE_SCALE: f64 = 10_000_000.0;

/// Sensor-type identifier carried in every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensorId {
    Gnss = 1,
    Barometric = 2,
    Acceleration = 3,
    Gyroscope = 4,
    Magnetometer = 5,
    Humidity = 6,
}

impl SensorId {
    /// All known sensors in wire-id order
    pub const ALL: [SensorId; 6] = [
        SensorId::Gnss,
        SensorId::Barometric,
        SensorId::Acceleration,
        SensorId::Gyroscope,
        SensorId::Magnetometer,
        SensorId::Humidity,
    ];

    /// Numeric id as transmitted
    pub fn wire_id(self) -> u32 {
        self as u32
    }

    /// Field schema for this sensor
    pub fn schema(self) -> &'static SensorSchema {
        &SCHEMAS[self as usize - 1]
    }

    /// Human-readable sensor name
    pub fn name(self) -> &'static str {
        self.schema().name
    }
}

impl TryFrom<u32> for SensorId {
    type Error = u32;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(SensorId::Gnss),
            2 => Ok(SensorId::Barometric),
            3 => Ok(SensorId::Acceleration),
            4 => Ok(SensorId::Gyroscope),
            5 => Ok(SensorId::Magnetometer),
            6 => Ok(SensorId::Humidity),
            other => Err(other),
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Signed 32-bit integer (coordinates)
    Int,
    /// Unsigned 8-bit count (satellites in view)
    UInt,
    /// 32-bit float rendered with a fixed number of decimals
    Float,
}

/// One entry of a sensor schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Column label used in console output and telemetry logs
    pub label: &'static str,

    /// Declared type
    pub kind: FieldKind,

    /// Decimal places on the wire (floats only)
    pub precision: usize,
}

/// Field layout of one sensor type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSchema {
    pub id: SensorId,
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SensorSchema {
    /// Number of fields expected on the wire
    pub fn arity(&self) -> usize {
        self.fields.len()
    }
}

const fn int(label: &'static str) -> FieldSpec {
    FieldSpec { label, kind: FieldKind::Int, precision: 0 }
}

const fn uint(label: &'static str) -> FieldSpec {
    FieldSpec { label, kind: FieldKind::UInt, precision: 0 }
}

const fn float(label: &'static str, precision: usize) -> FieldSpec {
    FieldSpec { label, kind: FieldKind::Float, precision }
}

/// Schema table, indexed by `wire id - 1`
pub static SCHEMAS: [SensorSchema; 6] = [
    SensorSchema {
        id: SensorId::Gnss,
        name: "GNSS",
        fields: &[int("Latitude"), int("Longitude"), uint("SIV")],
    },
    SensorSchema {
        id: SensorId::Barometric,
        name: "Barometric",
        fields: &[float("Pressure", 2), float("Temperature", 2), float("Altitude", 2)],
    },
    SensorSchema {
        id: SensorId::Acceleration,
        name: "Acceleration",
        fields: &[
            float("X-Acceleration", 3),
            float("Y-Acceleration", 3),
            float("Z-Acceleration", 3),
        ],
    },
    SensorSchema {
        id: SensorId::Gyroscope,
        name: "Gyroscope",
        fields: &[float("X-Gyro", 3), float("Y-Gyro", 3), float("Z-Gyro", 3)],
    },
    SensorSchema {
        id: SensorId::Magnetometer,
        name: "Magnetometer",
        fields: &[float("X-Magnet", 2), float("Y-Magnet", 2), float("Z-Magnet", 2)],
    },
    SensorSchema {
        id: SensorId::Humidity,
        name: "Humidity",
        fields: &[float("Temperature", 2), float("Humidity", 2)],
    },
];

/// A typed field value, the unit of both encoding and decoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i32),
    UInt(u8),
    Float(f32),
}

impl FieldValue {
    /// Kind of this value
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::UInt(_) => FieldKind::UInt,
            FieldValue::Float(_) => FieldKind::Float,
        }
    }

    /// Value widened to f64 (for logs and JSON records)
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::Int(v) => v as f64,
            FieldValue::UInt(v) => v as f64,
            FieldValue::Float(v) => v as f64,
        }
    }
}

/// GNSS fix as transmitted by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnssFix {
    /// Latitude in degrees × 10^7
    pub latitude: i32,

    /// Longitude in degrees × 10^7
    pub longitude: i32,

    /// Satellites in view
    pub satellites: u8,
}

impl GnssFix {
    /// Convert the raw fix into a validated position
    ///
    /// # Errors
    ///
    /// Returns `InvalidPosition` if the coordinates are out of range
    pub fn position(&self) -> Result<Position> {
        Position::new(
            self.latitude as f64 / GNSS_COORDINATE_SCALE,
            self.longitude as f64 / GNSS_COORDINATE_SCALE,
        )
    }
}

/// Barometer reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barometric {
    /// Pressure in kPa
    pub pressure: f32,

    /// Temperature in °C
    pub temperature: f32,

    /// Altitude in meters
    pub altitude: f32,
}

/// Three-axis IMU sample (acceleration m/s², gyro dps, magnetic field µT)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Humidity sensor reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Humidity {
    /// Temperature in °C
    pub temperature: f32,

    /// Relative humidity in percent
    pub humidity: f32,
}

/// One sensor reading, tagged by sensor type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Gnss(GnssFix),
    Barometric(Barometric),
    Acceleration(Vector3),
    Gyroscope(Vector3),
    Magnetometer(Vector3),
    Humidity(Humidity),
}

impl SensorReading {
    /// Sensor type of this reading
    pub fn sensor_id(&self) -> SensorId {
        match self {
            SensorReading::Gnss(_) => SensorId::Gnss,
            SensorReading::Barometric(_) => SensorId::Barometric,
            SensorReading::Acceleration(_) => SensorId::Acceleration,
            SensorReading::Gyroscope(_) => SensorId::Gyroscope,
            SensorReading::Magnetometer(_) => SensorId::Magnetometer,
            SensorReading::Humidity(_) => SensorId::Humidity,
        }
    }

    /// Fields in schema order
    pub fn fields(&self) -> Vec<FieldValue> {
        use FieldValue::{Float, Int, UInt};

        match *self {
            SensorReading::Gnss(g) => vec![Int(g.latitude), Int(g.longitude), UInt(g.satellites)],
            SensorReading::Barometric(b) => {
                vec![Float(b.pressure), Float(b.temperature), Float(b.altitude)]
            }
            SensorReading::Acceleration(v)
            | SensorReading::Gyroscope(v)
            | SensorReading::Magnetometer(v) => vec![Float(v.x), Float(v.y), Float(v.z)],
            SensorReading::Humidity(h) => vec![Float(h.temperature), Float(h.humidity)],
        }
    }

    /// Build a reading from fields that already match the schema
    ///
    /// Returns `None` if the field kinds or count do not match `id`'s schema.
    pub fn from_fields(id: SensorId, fields: &[FieldValue]) -> Option<Self> {
        use FieldValue::{Float, Int, UInt};

        let reading = match (id, fields) {
            (SensorId::Gnss, &[Int(latitude), Int(longitude), UInt(satellites)]) => {
                SensorReading::Gnss(GnssFix { latitude, longitude, satellites })
            }
            (SensorId::Barometric, &[Float(pressure), Float(temperature), Float(altitude)]) => {
                SensorReading::Barometric(Barometric { pressure, temperature, altitude })
            }
            (SensorId::Acceleration, &[Float(x), Float(y), Float(z)]) => {
                SensorReading::Acceleration(Vector3 { x, y, z })
            }
            (SensorId::Gyroscope, &[Float(x), Float(y), Float(z)]) => {
                SensorReading::Gyroscope(Vector3 { x, y, z })
            }
            (SensorId::Magnetometer, &[Float(x), Float(y), Float(z)]) => {
                SensorReading::Magnetometer(Vector3 { x, y, z })
            }
            (SensorId::Humidity, &[Float(temperature), Float(humidity)]) => {
                SensorReading::Humidity(Humidity { temperature, humidity })
            }
            _ => return None,
        };

        Some(reading)
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.sensor_id().schema();
        write!(f, "{}:", schema.name)?;

        for (spec, value) in schema.fields.iter().zip(self.fields()) {
            match value {
                FieldValue::Int(v) => write!(f, " {}={}", spec.label, v)?,
                FieldValue::UInt(v) => write!(f, " {}={}", spec.label, v)?,
                FieldValue::Float(v) => write!(f, " {}={:.*}", spec.label, spec.precision, v)?,
            }
        }

        Ok(())
    }
}

/// A decoded reading stamped with the receiver's wall clock
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub reading: SensorReading,

    /// Receiver-local UTC time captured at decode time (not transmitted)
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_id_round_trip() {
        for id in SensorId::ALL {
            assert_eq!(SensorId::try_from(id.wire_id()), Ok(id));
        }
        assert_eq!(SensorId::try_from(0), Err(0));
        assert_eq!(SensorId::try_from(7), Err(7));
        assert_eq!(SensorId::try_from(42), Err(42));
    }

    #[test]
    fn test_schema_table_is_indexed_by_id() {
        for id in SensorId::ALL {
            assert_eq!(id.schema().id, id);
        }
    }

    #[test]
    fn test_schema_arity() {
        assert_eq!(SensorId::Gnss.schema().arity(), 3);
        assert_eq!(SensorId::Barometric.schema().arity(), 3);
        assert_eq!(SensorId::Acceleration.schema().arity(), 3);
        assert_eq!(SensorId::Gyroscope.schema().arity(), 3);
        assert_eq!(SensorId::Magnetometer.schema().arity(), 3);
        assert_eq!(SensorId::Humidity.schema().arity(), 2);
    }

    #[test]
    fn test_physical_units_keep_two_decimals() {
        for id in SensorId::ALL {
            for spec in id.schema().fields {
                if spec.kind == FieldKind::Float {
                    assert!(spec.precision >= 2, "{} {} has precision {}", id, spec.label, spec.precision);
                }
            }
        }
    }

    #[test]
    fn test_from_fields_rejects_wrong_kinds() {
        let fields = [FieldValue::Float(1.0), FieldValue::Float(2.0), FieldValue::Float(3.0)];
        assert!(SensorReading::from_fields(SensorId::Gnss, &fields).is_none());
        assert!(SensorReading::from_fields(SensorId::Humidity, &fields).is_none());
        assert!(SensorReading::from_fields(SensorId::Gyroscope, &fields).is_some());
    }

    #[test]
    fn test_fields_match_schema_kinds() {
        let readings = [
            SensorReading::Gnss(GnssFix { latitude: 1, longitude: 2, satellites: 3 }),
            SensorReading::Humidity(Humidity { temperature: 21.0, humidity: 40.0 }),
        ];

        for reading in readings {
            let schema = reading.sensor_id().schema();
            let kinds: Vec<_> = reading.fields().iter().map(FieldValue::kind).collect();
            let expected: Vec<_> = schema.fields.iter().map(|f| f.kind).collect();
            assert_eq!(kinds, expected);
        }
    }

    #[test]
    fn test_gnss_fix_position() {
        let fix = GnssFix { latitude: 340_000_000, longitude: -1_180_000_000, satellites: 9 };
        let position = fix.position().unwrap();
        assert!((position.latitude - 34.0).abs() < 1e-9);
        assert!((position.longitude + 118.0).abs() < 1e-9);
    }

    #[test]
    fn test_gnss_fix_out_of_range_position() {
        let fix = GnssFix { latitude: 950_000_000, longitude: 0, satellites: 0 };
        assert!(fix.position().is_err());
    }

    #[test]
    fn test_display_reading() {
        let reading = SensorReading::Barometric(Barometric {
            pressure: 101.32,
            temperature: 22.5,
            altitude: 15.0,
        });
        assert_eq!(
            reading.to_string(),
            "Barometric: Pressure=101.32 Temperature=22.50 Altitude=15.00"
        );
    }
}
