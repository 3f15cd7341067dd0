//! Error topic record building
//!
//! Maps a terminal per-record failure onto the record published to the error
//! topic: a JSON document with the fixed error keys, plus error metadata
//! headers, the original record headers, and (when a response exists)
//! `http.response.*` copies. Only record-level and response-level headers are
//! copied; request headers never enter an error record, so credentials
//! attached to the outbound request cannot leak here.

use crate::client::HttpResponse;
use crate::config::ErrorTopicConfig;
use crate::publish::PublishedRecord;
use crate::record::SinkRecord;
use crate::response::RESPONSE_HEADER_PREFIX;
use serde_json::json;
use tracing::debug;

// Error metadata header names.
pub const HEADER_ERROR_TYPE: &str = "error.type";
pub const HEADER_ERROR_MESSAGE: &str = "error.message";
pub const HEADER_ERROR_TIMESTAMP: &str = "error.timestamp";
pub const HEADER_HTTP_STATUS_CODE: &str = "error.http.status.code";
pub const HEADER_RETRY_COUNT: &str = "error.retry.count";
pub const HEADER_ORIGINAL_TOPIC: &str = "kafka.original.topic";
pub const HEADER_ORIGINAL_PARTITION: &str = "kafka.original.partition";
pub const HEADER_ORIGINAL_OFFSET: &str = "kafka.original.offset";

/// Terminal failure classification, as carried in the error record's
/// `errorType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConversionError,
    NullValue,
    HttpError,
    RetryExhausted,
    HttpException,
    ProcessingError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ConversionError => "CONVERSION_ERROR",
            FailureKind::NullValue => "NULL_VALUE",
            FailureKind::HttpError => "HTTP_ERROR",
            FailureKind::RetryExhausted => "RETRY_EXHAUSTED",
            FailureKind::HttpException => "HTTP_EXCEPTION",
            FailureKind::ProcessingError => "PROCESSING_ERROR",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds error-topic records. Configured once per task.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    topic_template: String,
}

impl ErrorHandler {
    /// The config must have a topic name; enforced by config validation.
    pub fn new(config: &ErrorTopicConfig) -> Self {
        Self {
            topic_template: config.name.clone().unwrap_or_default(),
        }
    }

    /// Resolve the error topic: every `${topic}` occurrence substitutes the
    /// source topic.
    pub fn resolve_topic(&self, source_topic: &str) -> String {
        self.topic_template.replace("${topic}", source_topic)
    }

    /// Build the record for one terminal failure.
    ///
    /// `retry_count` is the number of HTTP attempts actually made; zero means
    /// the failure occurred before any attempt (null value, conversion).
    pub fn build(
        &self,
        record: &SinkRecord,
        kind: FailureKind,
        message: &str,
        response: Option<&HttpResponse>,
        retry_count: u32,
    ) -> PublishedRecord {
        let error_timestamp = chrono::Utc::now().timestamp_millis();

        let mut doc = serde_json::Map::new();
        doc.insert("errorType".to_string(), json!(kind.as_str()));
        doc.insert("errorMessage".to_string(), json!(message));
        doc.insert("errorTimestamp".to_string(), json!(error_timestamp));
        if retry_count > 0 {
            doc.insert("retryCount".to_string(), json!(retry_count));
        }
        if let Some(response) = response {
            doc.insert("httpStatusCode".to_string(), json!(response.status));
            if let Some(body) = &response.body {
                doc.insert("httpResponseBody".to_string(), json!(body));
            }
        }
        doc.insert("originalTopic".to_string(), json!(record.topic));
        doc.insert("originalPartition".to_string(), json!(record.partition));
        doc.insert("originalOffset".to_string(), json!(record.offset));

        let mut out = PublishedRecord::new(self.resolve_topic(&record.topic));
        out.key = record.key.clone();
        out.value = Some(serde_json::Value::Object(doc).to_string().into_bytes());

        // 1. Original record headers, unfiltered.
        for header in &record.headers {
            out.headers.push((header.key.clone(), header.value.as_bytes()));
        }

        // 2. HTTP response headers, when a response exists.
        if let Some(response) = response {
            for (name, value) in &response.headers {
                out.headers.push((
                    format!("{}{}", RESPONSE_HEADER_PREFIX, name),
                    Some(value.clone().into_bytes()),
                ));
            }
        }

        // 3. Error metadata; all values are UTF-8 text bytes.
        push_text(&mut out, HEADER_ERROR_TYPE, kind.as_str());
        push_text(&mut out, HEADER_ERROR_MESSAGE, message);
        push_text(&mut out, HEADER_ERROR_TIMESTAMP, error_timestamp);
        if let Some(response) = response {
            push_text(&mut out, HEADER_HTTP_STATUS_CODE, response.status);
        }
        if retry_count > 0 {
            push_text(&mut out, HEADER_RETRY_COUNT, retry_count);
        }
        push_text(&mut out, HEADER_ORIGINAL_TOPIC, &record.topic);
        push_text(&mut out, HEADER_ORIGINAL_PARTITION, record.partition);
        push_text(&mut out, HEADER_ORIGINAL_OFFSET, record.offset);

        debug!(
            topic = %out.topic,
            error_type = %kind,
            original_topic = %record.topic,
            original_offset = record.offset,
            "Built error record"
        );

        out
    }
}

fn push_text(record: &mut PublishedRecord, name: &str, value: impl ToString) {
    record
        .headers
        .push((name.to_string(), Some(value.to_string().into_bytes())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HeaderValue, RecordValue, SinkRecord};
    use serde_json::Value;

    fn handler(template: &str) -> ErrorHandler {
        ErrorHandler::new(&ErrorTopicConfig {
            enabled: true,
            name: Some(template.to_string()),
        })
    }

    fn record() -> SinkRecord {
        SinkRecord::new("events", 2, 12345, RecordValue::String("x".into()))
            .with_key("k1")
            .with_header("trace-id", HeaderValue::String("abc".into()))
    }

    fn parse_doc(out: &PublishedRecord) -> Value {
        serde_json::from_slice(out.value.as_deref().unwrap()).unwrap()
    }

    // ---- 1. Topic template ----

    #[test]
    fn test_topic_substitution() {
        let h = handler("${topic}.errors");
        assert_eq!(h.resolve_topic("orders"), "orders.errors");
    }

    // ---- 2. Document keys for an HTTP failure ----

    #[test]
    fn test_http_error_document() {
        let h = handler("errors");
        let response = HttpResponse {
            status: 500,
            headers: vec![("Retry-After".to_string(), "1".to_string())],
            body: Some("{\"error\": \"boom\"}".to_string()),
            elapsed_ms: 12,
        };
        let out = h.build(
            &record(),
            FailureKind::RetryExhausted,
            "HTTP request failed after 5 attempts",
            Some(&response),
            5,
        );

        let doc = parse_doc(&out);
        assert_eq!(doc["errorType"], json!("RETRY_EXHAUSTED"));
        assert_eq!(doc["errorMessage"], json!("HTTP request failed after 5 attempts"));
        assert!(doc["errorTimestamp"].as_i64().unwrap() > 0);
        assert_eq!(doc["retryCount"], json!(5));
        assert_eq!(doc["httpStatusCode"], json!(500));
        assert_eq!(doc["httpResponseBody"], json!("{\"error\": \"boom\"}"));
        assert_eq!(doc["originalTopic"], json!("events"));
        assert_eq!(doc["originalPartition"], json!(2));
        assert_eq!(doc["originalOffset"], json!(12345));

        assert_eq!(out.key.as_deref(), Some("k1"));
    }

    // ---- 3. Optional keys are omitted when inapplicable ----

    #[test]
    fn test_optional_keys_omitted() {
        let h = handler("errors");
        let out = h.build(&record(), FailureKind::NullValue, "Null value", None, 0);
        let doc = parse_doc(&out);
        assert_eq!(doc["errorType"], json!("NULL_VALUE"));
        assert!(doc.get("retryCount").is_none());
        assert!(doc.get("httpStatusCode").is_none());
        assert!(doc.get("httpResponseBody").is_none());
    }

    // ---- 4. Header block: originals, response copies, error metadata ----

    #[test]
    fn test_header_layout() {
        let h = handler("errors");
        let response = HttpResponse {
            status: 404,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: None,
            elapsed_ms: 3,
        };
        let out = h.build(&record(), FailureKind::HttpError, "not found", Some(&response), 0);

        let names: Vec<&str> = out.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "trace-id",
                "http.response.Content-Type",
                HEADER_ERROR_TYPE,
                HEADER_ERROR_MESSAGE,
                HEADER_ERROR_TIMESTAMP,
                HEADER_HTTP_STATUS_CODE,
                HEADER_ORIGINAL_TOPIC,
                HEADER_ORIGINAL_PARTITION,
                HEADER_ORIGINAL_OFFSET,
            ]
        );
        assert_eq!(out.header_text(HEADER_ERROR_TYPE).as_deref(), Some("HTTP_ERROR"));
        assert_eq!(out.header_text(HEADER_HTTP_STATUS_CODE).as_deref(), Some("404"));
        assert_eq!(out.header_text(HEADER_ORIGINAL_PARTITION).as_deref(), Some("2"));
    }

    // ---- 5. Retry count header only when attempts were made ----

    #[test]
    fn test_retry_count_header_presence() {
        let h = handler("errors");
        let with = h.build(&record(), FailureKind::HttpException, "io", None, 3);
        assert_eq!(with.header_text(HEADER_RETRY_COUNT).as_deref(), Some("3"));

        let without = h.build(&record(), FailureKind::ConversionError, "bad", None, 0);
        assert!(without.headers.iter().all(|(n, _)| n != HEADER_RETRY_COUNT));
    }

    // ---- 6. Request credentials never enter the record ----

    #[test]
    fn test_no_request_material_in_record() {
        // The builder only sees the source record and the response; an
        // Authorization header can appear in an error record only if the
        // *source record* carried one.
        let h = handler("errors");
        let out = h.build(&record(), FailureKind::HttpException, "io failure", None, 1);
        assert!(out
            .headers
            .iter()
            .all(|(n, _)| !n.eq_ignore_ascii_case("authorization")));
        let doc_text = String::from_utf8(out.value.clone().unwrap()).unwrap();
        assert!(!doc_text.contains("Bearer"));
    }

    // ---- 7. Failure kind wire names ----

    #[test]
    fn test_failure_kind_names() {
        assert_eq!(FailureKind::ConversionError.as_str(), "CONVERSION_ERROR");
        assert_eq!(FailureKind::NullValue.as_str(), "NULL_VALUE");
        assert_eq!(FailureKind::HttpError.as_str(), "HTTP_ERROR");
        assert_eq!(FailureKind::RetryExhausted.as_str(), "RETRY_EXHAUSTED");
        assert_eq!(FailureKind::HttpException.as_str(), "HTTP_EXCEPTION");
        assert_eq!(FailureKind::ProcessingError.as_str(), "PROCESSING_ERROR");
    }
}
