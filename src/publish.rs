//! Publisher seam
//!
//! The response and error handlers build [`PublishedRecord`]s; the producers
//! in [`crate::producer`] move them to the broker. The trait boundary keeps
//! the record-building logic broker-free and lets embedding code (and the
//! integration tests) substitute its own transport.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// One record bound for a broker topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    pub topic: String,
    /// Key in string form; the broker receives its UTF-8 bytes.
    pub key: Option<String>,
    /// Value bytes; `None` publishes a tombstone-style null value.
    pub value: Option<Vec<u8>>,
    /// Headers in emission order; a `None` value publishes a null header.
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl PublishedRecord {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            value: None,
            headers: Vec::new(),
        }
    }

    /// Look up a header value as text, for assertions and diagnostics.
    pub fn header_text(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
            .and_then(|v| String::from_utf8(v.clone()).ok())
    }
}

/// Moves records to a broker topic.
///
/// Implementations choose their own reliability profile; the durable
/// response producer propagates failures to its caller (which logs and
/// drops them), while the best-effort error producer never returns one.
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    /// Send one record.
    async fn publish(&self, record: PublishedRecord) -> Result<()>;

    /// Wait for outstanding sends, bounded by the deadline.
    async fn flush(&self, deadline: Duration) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_text_lookup() {
        let mut record = PublishedRecord::new("responses");
        record
            .headers
            .push(("http.status.code".to_string(), Some(b"200".to_vec())));
        record.headers.push(("null-header".to_string(), None));

        assert_eq!(record.header_text("http.status.code").as_deref(), Some("200"));
        assert_eq!(record.header_text("null-header"), None);
        assert_eq!(record.header_text("absent"), None);
    }
}
