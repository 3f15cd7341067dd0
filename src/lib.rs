#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # HTTP Sink Connector
//!
//! A sink connector that forwards records from Kafka-compatible brokers to
//! HTTP endpoints. Each consumed record becomes one HTTP request
//! (POST/PUT/DELETE); responses and terminal failures can be echoed to
//! secondary broker topics for downstream consumers.
//!
//! ## Features
//!
//! - **Record forwarding**: one HTTP request per record, strictly in offset
//!   order per source partition
//! - **Authentication**: none, basic, bearer, API key (header or query), and
//!   OAuth2 client credentials with cached, refresh-aware tokens
//! - **Header forwarding**: include/exclude globs, prefixing, sanitization,
//!   and static header injection
//! - **Retry**: exponential backoff with a ceiling, driven by configurable
//!   status codes and transport-fault classification
//! - **Response topic**: durable, ordered echo of HTTP responses with
//!   request metadata headers
//! - **Error topic**: best-effort structured error records for terminal
//!   per-record failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use http_sink_connector::{HttpSinkConfig, HttpSinkTask, SinkRecord, RecordValue};
//! use std::collections::HashMap;
//!
//! # async fn example() -> http_sink_connector::Result<()> {
//! let mut props = HashMap::new();
//! props.insert("http.api.url".to_string(), "https://api.example.com/events".to_string());
//! props.insert("response.topic.enabled".to_string(), "true".to_string());
//! props.insert("response.topic.name".to_string(), "${topic}-responses".to_string());
//!
//! let config = HttpSinkConfig::from_props(&props)?;
//! let task = HttpSinkTask::start(config).await?;
//!
//! let record = SinkRecord::new("events", 0, 100, RecordValue::String("{\"a\":1}".into()));
//! task.put(&[record]).await?;
//! task.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`]: recognized options, defaults, and fail-fast validation
//! - [`record`]: record, value, and header types delivered by the framework
//! - [`codec`]: record value to UTF-8 JSON request body
//! - [`headers`]: record header filtering, sanitization, and forwarding
//! - [`auth`]: credential providers, including OAuth2 client credentials
//! - [`client`]: pooled HTTP execution with transport-fault classification
//! - [`retry`]: stateless exponential-backoff retry policy
//! - [`publish`] / [`producer`]: broker publisher seam and the durable /
//!   best-effort producer pair
//! - [`response`] / [`failure`]: response- and error-topic record building
//! - [`task`]: the per-record state machine tying everything together
//! - [`connector`]: lifecycle surface for the host framework
//! - [`error`]: error types and `Result` alias

pub mod auth;
pub mod client;
pub mod codec;
pub mod config;
pub mod connector;
pub mod error;
pub mod failure;
pub mod headers;
pub mod producer;
pub mod publish;
pub mod record;
pub mod response;
pub mod retry;
pub mod task;

pub use client::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use config::{HttpSinkConfig, OnError, OnNullValues, ResponseValueFormat};
pub use connector::{ConnectorStatus, HttpSinkConnector};
pub use error::{ConfigError, HttpSinkError, Result};
pub use failure::FailureKind;
pub use publish::{PublishedRecord, RecordPublisher};
pub use record::{
    ConnectorState, FieldValue, HeaderValue, RecordHeader, RecordValue, SinkRecord, StructValue,
};
pub use task::{HttpSinkTask, TaskMetrics};

/// Connector version, fixed at build time from the crate metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.split('.').count() >= 2);
    }
}
