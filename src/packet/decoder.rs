//! # Telemetry Frame Decoder
//!
//! Demultiplexes received frames by sensor id and extracts the typed payload.
//!
//! Decoding runs in two steps: a single tokenizer splits the frame into the
//! sensor id and its field strings, then the schema table drives typed
//! extraction. Any failure drops the whole frame; no partial reading is ever
//! produced.

use chrono::Utc;

use super::protocol::*;
use crate::error::DecodeError;

/// Decode a raw frame into a sensor reading
///
/// Surrounding whitespace (line terminators from the serial bridge) is
/// ignored. Fields may be separated by `,` or `, `.
///
/// # Errors
///
/// Returns error if:
/// - The frame is not `[<int>;<fields>]` (`MalformedFrame`)
/// - The sensor id has no schema (`UnknownSensorId`)
/// - The field count or a field value does not match the schema
///   (`FieldParseFailure`)
///
/// # Examples
///
/// ```
/// use telemetry_link::packet::decoder::decode;
/// use telemetry_link::packet::protocol::SensorReading;
///
/// let reading = decode("[6;21.50,40.00]").unwrap();
/// assert!(matches!(reading, SensorReading::Humidity(_)));
/// ```
pub fn decode(raw: &str) -> Result<SensorReading, DecodeError> {
    let (sensor_id, tokens) = tokenize(raw)?;
    let id = SensorId::try_from(sensor_id).map_err(DecodeError::UnknownSensorId)?;
    let schema = id.schema();

    if tokens.len() != schema.arity() {
        return Err(DecodeError::FieldParseFailure {
            sensor_id,
            reason: format!("expected {} fields, got {}", schema.arity(), tokens.len()),
        });
    }

    let mut values = Vec::with_capacity(tokens.len());
    for (spec, token) in schema.fields.iter().zip(&tokens) {
        let value = parse_field(spec, token).ok_or_else(|| DecodeError::FieldParseFailure {
            sensor_id,
            reason: format!("field '{}' has invalid value '{}'", spec.label, token),
        })?;
        values.push(value);
    }

    SensorReading::from_fields(id, &values).ok_or_else(|| DecodeError::FieldParseFailure {
        sensor_id,
        reason: "fields do not match schema".to_string(),
    })
}

/// Decode a raw frame and stamp it with the receiver's clock
///
/// The timestamp is taken after a successful decode, so dropped frames never
/// consume one.
pub fn decode_frame(raw: &str) -> Result<DecodedFrame, DecodeError> {
    let reading = decode(raw)?;

    Ok(DecodedFrame {
        reading,
        received_at: Utc::now(),
    })
}

/// Split a frame into its sensor id and field tokens
///
/// Only checks the outer `[<int>;<rest>]` shape; field validation happens
/// against the schema.
fn tokenize(raw: &str) -> Result<(u32, Vec<&str>), DecodeError> {
    let frame = raw.trim();

    let inner = frame
        .strip_prefix(FRAME_START)
        .and_then(|rest| rest.strip_suffix(FRAME_END))
        .ok_or_else(|| DecodeError::MalformedFrame(format!("missing brackets in '{}'", frame)))?;

    let (id, rest) = inner
        .split_once(ID_SEPARATOR)
        .ok_or_else(|| DecodeError::MalformedFrame(format!("missing ';' in '{}'", frame)))?;

    let sensor_id = id
        .trim()
        .parse::<u32>()
        .map_err(|_| DecodeError::MalformedFrame(format!("invalid sensor id '{}'", id)))?;

    let tokens = rest.split(FIELD_SEPARATOR).map(str::trim).collect();

    Ok((sensor_id, tokens))
}

fn parse_field(spec: &FieldSpec, token: &str) -> Option<FieldValue> {
    match spec.kind {
        FieldKind::Int => token.parse::<i32>().ok().map(FieldValue::Int),
        FieldKind::UInt => token.parse::<u8>().ok().map(FieldValue::UInt),
        FieldKind::Float => token
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .map(FieldValue::Float),
    }
}
