//! Record types consumed by the sink task
//!
//! A [`SinkRecord`] is one offset-addressed unit delivered by the host
//! ingestion framework. Values and header values are typed: the broker wire
//! format does not constrain them to bytes by the time they reach a sink, so
//! the pipeline receives strings, byte strings, maps, schema-described
//! structs and primitives and converts each according to its own rules.

use serde::{Deserialize, Serialize};

/// A record delivered to the sink task.
///
/// Immutable within the pipeline; the task holds a reference until the
/// record's processing terminates.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    /// Source topic.
    pub topic: String,
    /// Source partition.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Timestamp in milliseconds since epoch, if the broker recorded one.
    pub timestamp: Option<i64>,
    /// Optional record key.
    pub key: Option<String>,
    /// Record value.
    pub value: RecordValue,
    /// Headers in arrival order.
    pub headers: Vec<RecordHeader>,
}

impl SinkRecord {
    /// Create a record with no key, timestamp, or headers.
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, value: RecordValue) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            timestamp: None,
            key: None,
            value,
            headers: Vec::new(),
        }
    }

    /// Set the record key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the record timestamp (milliseconds since epoch).
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    /// Append a header.
    pub fn with_header(mut self, key: impl Into<String>, value: HeaderValue) -> Self {
        self.headers.push(RecordHeader {
            key: key.into(),
            value,
        });
        self
    }

    /// Returns true if the record value is null.
    pub fn is_null_value(&self) -> bool {
        matches!(self.value, RecordValue::Null)
    }
}

/// A record header (key plus typed value).
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHeader {
    /// Header key.
    pub key: String,
    /// Header value.
    pub value: HeaderValue,
}

/// Typed header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl HeaderValue {
    /// Normalize the value to text for HTTP forwarding.
    ///
    /// Returns `None` for null values and for byte values that are not valid
    /// UTF-8; callers skip those headers.
    pub fn as_text(&self) -> Option<String> {
        match self {
            HeaderValue::String(s) => Some(s.clone()),
            HeaderValue::Bytes(b) => String::from_utf8(b.clone()).ok(),
            HeaderValue::Int(i) => Some(i.to_string()),
            HeaderValue::Float(f) => Some(f.to_string()),
            HeaderValue::Bool(b) => Some(b.to_string()),
            HeaderValue::Null => None,
        }
    }

    /// Raw bytes of the value for broker re-publication.
    ///
    /// Strings and primitives serialize as their UTF-8 text form; byte values
    /// pass through untouched; null stays null.
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            HeaderValue::Bytes(b) => Some(b.clone()),
            HeaderValue::Null => None,
            other => other.as_text().map(String::into_bytes),
        }
    }
}

/// Typed record value.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// Null value; handled per `behavior.on.null.values`.
    Null,
    /// Character string (may or may not be JSON).
    String(String),
    /// Byte string; interpreted as UTF-8 by the codec.
    Bytes(Vec<u8>),
    /// Ordered map of field name to JSON value.
    Map(serde_json::Map<String, serde_json::Value>),
    /// Schema-described struct.
    Struct(StructValue),
    /// Integer primitive.
    Int(i64),
    /// Floating-point primitive.
    Float(f64),
    /// Boolean primitive.
    Bool(bool),
}

impl RecordValue {
    /// Convenience constructor for a JSON-object map value.
    pub fn map_from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(RecordValue::Map(map)),
            _ => None,
        }
    }
}

/// A schema-described struct value: named fields in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    pub fields: Vec<(String, FieldValue)>,
}

impl StructValue {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field, preserving declaration order.
    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}

/// A struct field leaf. Integer widths are preserved through serialization;
/// timestamps are epoch milliseconds; bytes serialize as base64.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Milliseconds since epoch.
    Timestamp(i64),
    Null,
}

/// Runtime state of a connector or task, mirrored to the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectorState {
    /// Created but not yet started.
    Unassigned,
    /// Actively running.
    Running,
    /// Temporarily stopped.
    Paused,
    /// Encountered a fatal error.
    Failed,
}

impl std::fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorState::Unassigned => write!(f, "UNASSIGNED"),
            ConnectorState::Running => write!(f, "RUNNING"),
            ConnectorState::Paused => write!(f, "PAUSED"),
            ConnectorState::Failed => write!(f, "FAILED"),
        }
    }
}
