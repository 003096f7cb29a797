//! Conversion between plain JSON records and Firestore typed values

use serde_json::{json, Map, Number, Value};

use super::record::Record;
use super::StoreError;

/// Encode a record as a Firestore `fields` map
pub fn encode_fields(record: &Record) -> Result<Map<String, Value>, StoreError> {
    let mut fields = Map::new();
    for (name, value) in record {
        fields.insert(name.clone(), encode_value(value)?);
    }
    Ok(fields)
}

/// Encode one JSON value as a Firestore `Value`.
///
/// Integers outside the int64 range are rejected rather than widened to a
/// double, which would change them on the way back.
pub fn encode_value(value: &Value) -> Result<Value, StoreError> {
    let encoded = match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // integerValue is int64 carried as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None if n.is_u64() => {
                return Err(StoreError::Encode(format!("integer {} exceeds int64", n)));
            }
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values = items
                .iter()
                .map(encode_value)
                .collect::<Result<Vec<_>, _>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map)? } }),
    };
    Ok(encoded)
}

/// Decode a Firestore `fields` map into a record
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Record, StoreError> {
    let mut record = Record::new();
    for (name, value) in fields {
        record.insert(name.clone(), decode_value(value)?);
    }
    Ok(record)
}

/// Decode one Firestore `Value`
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let object = value
        .as_object()
        .ok_or_else(|| StoreError::Decode(format!("expected value object, got {}", value)))?;

    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| StoreError::Decode("empty value object".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| bad_kind(kind, inner)),
        "integerValue" => decode_integer(inner).ok_or_else(|| bad_kind(kind, inner)),
        "doubleValue" => Ok(decode_double(inner)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| bad_kind(kind, inner)),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        })),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                Some(other) => return Err(bad_kind(kind, other)),
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => Ok(Value::Object(decode_fields(fields)?)),
            Some(other) => Err(bad_kind(kind, other)),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(StoreError::Decode(format!("unsupported value kind `{}`", other))),
    }
}

fn decode_integer(inner: &Value) -> Option<Value> {
    match inner {
        Value::String(s) => s.parse::<i64>().ok().map(Value::from),
        Value::Number(n) if n.is_i64() => Some(Value::Number(n.clone())),
        _ => None,
    }
}

// NaN and the infinities arrive as strings and have no JSON form
fn decode_double(inner: &Value) -> Value {
    inner
        .as_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn bad_kind(kind: &str, inner: &Value) -> StoreError {
    StoreError::Decode(format!("invalid {}: {}", kind, inner))
}
