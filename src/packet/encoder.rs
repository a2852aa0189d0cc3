//! # Telemetry Frame Encoder
//!
//! Serializes one sensor reading into a `[<id>;<csv>]` text frame.

use super::protocol::*;
use crate::error::EncodingError;

/// Encode an ordered list of field values into a frame
///
/// Floats are rendered with the fixed number of decimals declared in the
/// sensor schema; integers are rendered in full. Field values are never
/// escaped, so callers must not produce values containing `,`, `;`, `[` or
/// `]` (numeric values never do).
///
/// # Arguments
///
/// * `sensor_id` - Wire sensor identifier (1-6)
/// * `fields` - Values in schema order
///
/// # Errors
///
/// Returns error if:
/// - The sensor id has no schema
/// - The field count differs from the schema arity
/// - A field kind differs from the schema
/// - A float field is NaN or infinite
///
/// # Examples
///
/// ```
/// use telemetry_link::packet::encoder::encode;
/// use telemetry_link::packet::protocol::FieldValue;
///
/// let frame = encode(6, &[FieldValue::Float(21.5), FieldValue::Float(40.0)]).unwrap();
/// assert_eq!(frame, "[6;21.50,40.00]");
/// ```
pub fn encode(sensor_id: u32, fields: &[FieldValue]) -> Result<String, EncodingError> {
    let id = SensorId::try_from(sensor_id).map_err(EncodingError::UnknownSensorId)?;
    let schema = id.schema();

    if fields.len() != schema.arity() {
        return Err(EncodingError::ArityMismatch {
            sensor_id,
            expected: schema.arity(),
            actual: fields.len(),
        });
    }

    if let Some(spec) = schema
        .fields
        .iter()
        .zip(fields)
        .find_map(|(spec, value)| (spec.kind != value.kind()).then_some(spec))
    {
        return Err(EncodingError::FieldKindMismatch {
            sensor_id,
            label: spec.label,
        });
    }

    if let Some(spec) = schema
        .fields
        .iter()
        .zip(fields)
        .find_map(|(spec, value)| matches!(value, FieldValue::Float(v) if !v.is_finite()).then_some(spec))
    {
        return Err(EncodingError::NonFiniteField {
            sensor_id,
            label: spec.label,
        });
    }

    Ok(render(schema, fields))
}

/// Encode a typed reading into a frame
///
/// A reading always matches its own schema, so the only possible error is a
/// NaN or infinite float.
///
/// # Examples
///
/// ```
/// use telemetry_link::packet::encoder::encode_reading;
/// use telemetry_link::packet::protocol::{Barometric, SensorReading};
///
/// let reading = SensorReading::Barometric(Barometric {
///     pressure: 101.32,
///     temperature: 22.5,
///     altitude: 15.0,
/// });
/// assert_eq!(encode_reading(&reading).unwrap(), "[2;101.32,22.50,15.00]");
/// ```
pub fn encode_reading(reading: &SensorReading) -> Result<String, EncodingError> {
    encode(reading.sensor_id().wire_id(), &reading.fields())
}

fn render(schema: &SensorSchema, fields: &[FieldValue]) -> String {
    let body = schema
        .fields
        .iter()
        .zip(fields)
        .map(|(spec, value)| match *value {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::UInt(v) => v.to_string(),
            FieldValue::Float(v) => format!("{:.*}", spec.precision, v),
        })
        .collect::<Vec<_>>()
        .join(&FIELD_SEPARATOR.to_string());

    format!("{}{}{}{}{}", FRAME_START, schema.id.wire_id(), ID_SEPARATOR, body, FRAME_END)
}
