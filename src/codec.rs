//! Record value codec
//!
//! Maps a typed record value to a UTF-8 request body. Structured inputs are
//! guaranteed to leave as well-formed JSON; primitives and non-JSON strings
//! are wrapped in a `{"value": ...}` envelope so the endpoint always receives
//! a JSON document.

use crate::error::{HttpSinkError, Result};
use crate::record::{FieldValue, RecordValue, SinkRecord, StructValue};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

/// Default content type for encoded bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Stateless value-to-body codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCodec;

impl ValueCodec {
    pub fn new() -> Self {
        Self
    }

    /// Convert a record's value into the HTTP request body.
    ///
    /// Fails with a conversion fault for undecodable byte values and with a
    /// null-value fault for null values (callers normally short-circuit
    /// nulls before reaching the codec).
    pub fn encode(&self, record: &SinkRecord) -> Result<String> {
        match &record.value {
            RecordValue::Null => Err(HttpSinkError::NullValue {
                topic: record.topic.clone(),
                partition: record.partition,
                offset: record.offset,
            }),
            RecordValue::String(s) => Ok(encode_string(s)),
            RecordValue::Bytes(b) => {
                let s = std::str::from_utf8(b).map_err(|e| {
                    HttpSinkError::conversion(format!(
                        "record value is not valid UTF-8 (topic={}, partition={}, offset={}): {}",
                        record.topic, record.partition, record.offset, e
                    ))
                })?;
                Ok(encode_string(s))
            }
            RecordValue::Map(map) => serde_json::to_string(map).map_err(|e| {
                HttpSinkError::conversion(format!("failed to serialize map value: {}", e))
            }),
            RecordValue::Struct(s) => encode_struct(s),
            RecordValue::Int(i) => Ok(wrap_value(json!(i))),
            RecordValue::Float(f) => Ok(wrap_value(json!(f))),
            RecordValue::Bool(b) => Ok(wrap_value(json!(b))),
        }
    }
}

/// String rule: JSON objects and arrays pass verbatim, JSON primitives are
/// wrapped, non-JSON strings are wrapped as JSON strings.
fn encode_string(s: &str) -> String {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(_)) | Ok(Value::Array(_)) => s.to_string(),
        Ok(primitive) => wrap_value(primitive),
        Err(_) => wrap_value(Value::String(s.to_string())),
    }
}

fn wrap_value(value: Value) -> String {
    let mut wrapper = serde_json::Map::with_capacity(1);
    wrapper.insert("value".to_string(), value);
    // A one-entry map of JSON values cannot fail to serialize.
    Value::Object(wrapper).to_string()
}

/// Struct rule: field order preserved, integer widths preserved as JSON
/// numbers, timestamps as epoch milliseconds, bytes as base64 strings.
fn encode_struct(s: &StructValue) -> Result<String> {
    let mut map = serde_json::Map::with_capacity(s.fields.len());
    for (name, field) in &s.fields {
        map.insert(name.clone(), field_to_json(field));
    }
    serde_json::to_string(&Value::Object(map))
        .map_err(|e| HttpSinkError::conversion(format!("failed to serialize struct value: {}", e)))
}

fn field_to_json(field: &FieldValue) -> Value {
    match field {
        FieldValue::Int8(v) => json!(v),
        FieldValue::Int16(v) => json!(v),
        FieldValue::Int32(v) => json!(v),
        FieldValue::Int64(v) => json!(v),
        FieldValue::Float32(v) => json!(v),
        FieldValue::Float64(v) => json!(v),
        FieldValue::Bool(v) => json!(v),
        FieldValue::String(v) => json!(v),
        FieldValue::Bytes(v) => json!(BASE64.encode(v)),
        FieldValue::Timestamp(ms) => json!(ms),
        FieldValue::Null => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SinkRecord;

    fn record(value: RecordValue) -> SinkRecord {
        SinkRecord::new("events", 0, 100, value)
    }

    // ---- 1. JSON object strings pass verbatim ----

    #[test]
    fn test_json_object_string_verbatim() {
        let codec = ValueCodec::new();
        let body = codec
            .encode(&record(RecordValue::String("{\"a\":1}".into())))
            .unwrap();
        assert_eq!(body, "{\"a\":1}");
    }

    // ---- 2. JSON array strings pass verbatim ----

    #[test]
    fn test_json_array_string_verbatim() {
        let codec = ValueCodec::new();
        let body = codec
            .encode(&record(RecordValue::String("[1,2,3]".into())))
            .unwrap();
        assert_eq!(body, "[1,2,3]");
    }

    // ---- 3. JSON primitive strings are wrapped ----

    #[test]
    fn test_json_primitive_string_wrapped() {
        let codec = ValueCodec::new();
        assert_eq!(
            codec.encode(&record(RecordValue::String("42".into()))).unwrap(),
            "{\"value\":42}"
        );
        assert_eq!(
            codec.encode(&record(RecordValue::String("true".into()))).unwrap(),
            "{\"value\":true}"
        );
        assert_eq!(
            codec.encode(&record(RecordValue::String("null".into()))).unwrap(),
            "{\"value\":null}"
        );
        assert_eq!(
            codec
                .encode(&record(RecordValue::String("\"quoted\"".into())))
                .unwrap(),
            "{\"value\":\"quoted\"}"
        );
    }

    // ---- 4. Non-JSON strings are wrapped as JSON strings ----

    #[test]
    fn test_plain_string_wrapped() {
        let codec = ValueCodec::new();
        assert_eq!(
            codec
                .encode(&record(RecordValue::String("hello world".into())))
                .unwrap(),
            "{\"value\":\"hello world\"}"
        );
    }

    // ---- 5. Primitive wrapping (scenario: value 42 → {"value":42}) ----

    #[test]
    fn test_primitive_wrapping() {
        let codec = ValueCodec::new();
        assert_eq!(
            codec.encode(&record(RecordValue::Int(42))).unwrap(),
            "{\"value\":42}"
        );
        assert_eq!(
            codec.encode(&record(RecordValue::Bool(false))).unwrap(),
            "{\"value\":false}"
        );
        assert_eq!(
            codec.encode(&record(RecordValue::Float(1.5))).unwrap(),
            "{\"value\":1.5}"
        );
    }

    // ---- 6. Byte values decode as UTF-8 and follow the string rule ----

    #[test]
    fn test_bytes_follow_string_rule() {
        let codec = ValueCodec::new();
        assert_eq!(
            codec
                .encode(&record(RecordValue::Bytes(b"{\"k\":\"v\"}".to_vec())))
                .unwrap(),
            "{\"k\":\"v\"}"
        );
        assert_eq!(
            codec
                .encode(&record(RecordValue::Bytes(b"plain".to_vec())))
                .unwrap(),
            "{\"value\":\"plain\"}"
        );
    }

    // ---- 7. Invalid UTF-8 bytes are a conversion fault ----

    #[test]
    fn test_invalid_utf8_bytes_fail() {
        let codec = ValueCodec::new();
        let err = codec
            .encode(&record(RecordValue::Bytes(vec![0xff, 0xfe, 0x00])))
            .unwrap_err();
        assert!(matches!(err, HttpSinkError::Conversion(_)));
        assert!(err.to_string().contains("UTF-8"));
    }

    // ---- 8. Maps serialize with insertion order preserved ----

    #[test]
    fn test_map_serialization_preserves_key_order() {
        let codec = ValueCodec::new();
        let mut map = serde_json::Map::new();
        map.insert("zebra".to_string(), json!(1));
        map.insert("alpha".to_string(), json!({"nested": true}));
        let body = codec.encode(&record(RecordValue::Map(map))).unwrap();

        // Insertion order survives serialization; "zebra" was inserted first
        // and must come out first even though it sorts after "alpha".
        let zebra = body.find("\"zebra\"").unwrap();
        let alpha = body.find("\"alpha\"").unwrap();
        assert!(zebra < alpha, "key order not preserved: {}", body);

        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["zebra"], json!(1));
        assert_eq!(parsed["alpha"]["nested"], json!(true));
    }

    // ---- 9. Struct serialization: widths, timestamps, bytes ----

    #[test]
    fn test_struct_serialization() {
        let codec = ValueCodec::new();
        let s = StructValue::new()
            .field("id", FieldValue::Int64(9_000_000_000))
            .field("small", FieldValue::Int8(-3))
            .field("ratio", FieldValue::Float32(0.5))
            .field("name", FieldValue::String("alice".into()))
            .field("created", FieldValue::Timestamp(1700000000000))
            .field("blob", FieldValue::Bytes(vec![1, 2, 3]))
            .field("gone", FieldValue::Null);
        let body = codec.encode(&record(RecordValue::Struct(s))).unwrap();

        // Declared field order survives; sorted order would put "name"
        // before "ratio" and "blob" before "created".
        assert!(body.find("\"ratio\"").unwrap() < body.find("\"name\"").unwrap());
        assert!(body.find("\"created\"").unwrap() < body.find("\"blob\"").unwrap());

        let parsed: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["id"], json!(9_000_000_000i64));
        assert_eq!(parsed["small"], json!(-3));
        assert_eq!(parsed["ratio"], json!(0.5));
        assert_eq!(parsed["name"], json!("alice"));
        assert_eq!(parsed["created"], json!(1700000000000i64));
        assert_eq!(parsed["blob"], json!("AQID"));
        assert_eq!(parsed["gone"], Value::Null);
    }

    // ---- 10. Null values raise the null-value fault ----

    #[test]
    fn test_null_value_fault() {
        let codec = ValueCodec::new();
        let err = codec.encode(&record(RecordValue::Null)).unwrap_err();
        assert!(matches!(err, HttpSinkError::NullValue { .. }));
    }
}
