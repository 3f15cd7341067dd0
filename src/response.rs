//! Response topic record building
//!
//! Maps a terminal HTTP response plus its source record onto the record
//! published to the response topic: `${topic}`-templated topic name,
//! optional original key and headers, `http.response.*` copies of the
//! response headers, and the request-metadata header block downstream
//! consumers key on.

use crate::client::HttpResponse;
use crate::config::{ResponseTopicConfig, ResponseValueFormat};
use crate::publish::PublishedRecord;
use crate::record::SinkRecord;
use tracing::{debug, warn};

// Metadata header names.
pub const HEADER_STATUS_CODE: &str = "http.status.code";
pub const HEADER_RESPONSE_TIME_MS: &str = "http.response.time.ms";
pub const HEADER_ORIGINAL_TOPIC: &str = "kafka.original.topic";
pub const HEADER_ORIGINAL_PARTITION: &str = "kafka.original.partition";
pub const HEADER_ORIGINAL_OFFSET: &str = "kafka.original.offset";
pub const HEADER_TIMESTAMP: &str = "kafka.timestamp";

/// Prefix for forwarded HTTP response headers.
pub const RESPONSE_HEADER_PREFIX: &str = "http.response.";

/// Builds response-topic records. Configured once per task.
#[derive(Debug, Clone)]
pub struct ResponseHandler {
    topic_template: String,
    include_original_key: bool,
    include_original_headers: bool,
    original_headers_include: Vec<String>,
    include_request_metadata: bool,
    value_format: ResponseValueFormat,
}

impl ResponseHandler {
    /// The config must have a topic name; enforced by config validation.
    pub fn new(config: &ResponseTopicConfig) -> Self {
        debug!(
            template = config.name.as_deref().unwrap_or(""),
            include_original_key = config.include_original_key,
            include_original_headers = config.include_original_headers,
            include_request_metadata = config.include_request_metadata,
            value_format = ?config.value_format,
            "Response handler initialized"
        );
        Self {
            topic_template: config.name.clone().unwrap_or_default(),
            include_original_key: config.include_original_key,
            include_original_headers: config.include_original_headers,
            original_headers_include: config.original_headers_include.clone(),
            include_request_metadata: config.include_request_metadata,
            value_format: config.value_format,
        }
    }

    /// Resolve the response topic: every `${topic}` occurrence substitutes
    /// the source topic, with no escaping.
    pub fn resolve_topic(&self, source_topic: &str) -> String {
        self.topic_template.replace("${topic}", source_topic)
    }

    /// Build the record for one terminal response.
    pub fn build(&self, response: &HttpResponse, record: &SinkRecord) -> PublishedRecord {
        let mut out = PublishedRecord::new(self.resolve_topic(&record.topic));

        out.key = if self.include_original_key {
            record.key.clone()
        } else {
            None
        };

        out.value = response.body.as_ref().map(|body| {
            if self.value_format == ResponseValueFormat::Json
                && serde_json::from_str::<serde_json::Value>(body).is_err()
            {
                // Fall back to the string form: forward the bytes verbatim.
                warn!(
                    topic = %out.topic,
                    status = response.status,
                    "Response body is not valid JSON; forwarding as string"
                );
            }
            body.clone().into_bytes()
        });

        // 1. Original record headers, optionally whitelisted.
        if self.include_original_headers {
            for header in &record.headers {
                if !self.original_headers_include.is_empty()
                    && !self.original_headers_include.contains(&header.key)
                {
                    continue;
                }
                out.headers.push((header.key.clone(), header.value.as_bytes()));
            }
        }

        // 2. HTTP response headers, renamed with original casing preserved.
        for (name, value) in &response.headers {
            out.headers.push((
                format!("{}{}", RESPONSE_HEADER_PREFIX, name),
                Some(value.clone().into_bytes()),
            ));
        }

        // 3. Request metadata.
        if self.include_request_metadata {
            push_text(&mut out, HEADER_STATUS_CODE, response.status);
            push_text(&mut out, HEADER_RESPONSE_TIME_MS, response.elapsed_ms);
            push_text(&mut out, HEADER_ORIGINAL_TOPIC, &record.topic);
            push_text(&mut out, HEADER_ORIGINAL_PARTITION, record.partition);
            push_text(&mut out, HEADER_ORIGINAL_OFFSET, record.offset);
            if let Some(ts) = record.timestamp {
                push_text(&mut out, HEADER_TIMESTAMP, ts);
            }
        }

        out
    }
}

fn push_text(record: &mut PublishedRecord, name: &str, value: impl ToString) {
    record
        .headers
        .push((name.to_string(), Some(value.to_string().into_bytes())));
}
