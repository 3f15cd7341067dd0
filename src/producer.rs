//! Broker producers for the response and error topics
//!
//! Two producers with deliberately different reliability profiles share this
//! module. The response producer is durable: acks from all replicas,
//! idempotent, a single in-flight request so response records land in source
//! order, and the caller waits for the delivery acknowledgment. The error
//! producer is best-effort: leader-only acks, one retry, parallel in-flight
//! requests, short timeouts, and a fire-and-forget enqueue whose delivery
//! outcome is only ever logged.

use crate::error::{HttpSinkError, Result};
use crate::publish::{PublishedRecord, RecordPublisher};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, error, info};

const RESPONSE_CLIENT_ID: &str = "http-sink-response-producer";
const ERROR_CLIENT_ID: &str = "http-sink-error-producer";

/// Durable producer for the response topic.
pub struct ResponseTopicProducer {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl ResponseTopicProducer {
    pub fn new(bootstrap_servers: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", RESPONSE_CLIENT_ID)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("max.in.flight.requests.per.connection", "1")
            .set("retries", "3")
            .set("request.timeout.ms", "30000")
            .set("message.timeout.ms", "60000")
            .set("compression.type", "snappy")
            .create()
            .map_err(|e| HttpSinkError::publish(format!("failed to create response producer: {}", e)))?;

        info!(bootstrap_servers = %bootstrap_servers, "Response producer initialized");

        Ok(Self {
            producer,
            send_timeout: Duration::from_secs(30),
        })
    }
}

#[async_trait]
impl RecordPublisher for ResponseTopicProducer {
    async fn publish(&self, record: PublishedRecord) -> Result<()> {
        let headers = to_owned_headers(&record);
        let mut future_record: FutureRecord<'_, String, Vec<u8>> =
            FutureRecord::to(&record.topic).headers(headers);
        if let Some(key) = &record.key {
            future_record = future_record.key(key);
        }
        if let Some(value) = &record.value {
            future_record = future_record.payload(value);
        }

        match self
            .producer
            .send(future_record, Timeout::After(self.send_timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(
                    topic = %record.topic,
                    partition = partition,
                    offset = offset,
                    "Response record delivered"
                );
                Ok(())
            }
            Err((e, _)) => Err(HttpSinkError::publish(format!(
                "failed to deliver response record to {}: {}",
                record.topic, e
            ))),
        }
    }

    async fn flush(&self, deadline: Duration) -> Result<()> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(deadline)))
            .await
            .map_err(|e| HttpSinkError::publish(format!("flush task failed: {}", e)))?
            .map_err(|e| HttpSinkError::publish(format!("response producer flush failed: {}", e)))
    }
}

/// Best-effort producer for the error topic.
///
/// `publish` never returns an error and never blocks on delivery; failures
/// surface only as log lines. This is load-bearing: an error-topic failure
/// must not trigger another error-topic send or fail the batch.
pub struct ErrorTopicProducer {
    producer: FutureProducer,
}

impl ErrorTopicProducer {
    pub fn new(bootstrap_servers: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", ERROR_CLIENT_ID)
            .set("acks", "1")
            .set("retries", "1")
            .set("max.in.flight.requests.per.connection", "5")
            .set("request.timeout.ms", "10000")
            .set("message.timeout.ms", "30000")
            .set("compression.type", "snappy")
            .create()
            .map_err(|e| HttpSinkError::publish(format!("failed to create error producer: {}", e)))?;

        info!(bootstrap_servers = %bootstrap_servers, "Error producer initialized");

        Ok(Self { producer })
    }
}

#[async_trait]
impl RecordPublisher for ErrorTopicProducer {
    async fn publish(&self, record: PublishedRecord) -> Result<()> {
        let headers = to_owned_headers(&record);
        let mut future_record: FutureRecord<'_, String, Vec<u8>> =
            FutureRecord::to(&record.topic).headers(headers);
        if let Some(key) = &record.key {
            future_record = future_record.key(key);
        }
        if let Some(value) = &record.value {
            future_record = future_record.payload(value);
        }

        let topic = record.topic.clone();
        match self.producer.send_result(future_record) {
            Ok(delivery) => {
                // Delivery is observed off the hot path; the pipeline moves on.
                tokio::spawn(async move {
                    match delivery.await {
                        Ok(Ok((partition, offset))) => {
                            debug!(
                                topic = %topic,
                                partition = partition,
                                offset = offset,
                                "Error record delivered"
                            );
                        }
                        Ok(Err((e, _))) => {
                            error!(topic = %topic, error = %e, "Failed to deliver error record");
                        }
                        Err(_) => {
                            error!(topic = %topic, "Error record delivery future canceled");
                        }
                    }
                });
            }
            Err((e, _)) => {
                error!(topic = %topic, error = %e, "Failed to enqueue error record");
            }
        }

        Ok(())
    }

    async fn flush(&self, deadline: Duration) -> Result<()> {
        let producer = self.producer.clone();
        let result = tokio::task::spawn_blocking(move || producer.flush(Timeout::After(deadline))).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Error producer flush failed"),
            Err(e) => error!(error = %e, "Error producer flush task failed"),
        }
        // Best-effort: flush problems are logged, never propagated.
        Ok(())
    }
}

fn to_owned_headers(record: &PublishedRecord) -> OwnedHeaders {
    let mut headers = OwnedHeaders::new_with_capacity(record.headers.len());
    for (key, value) in &record.headers {
        headers = headers.insert(Header {
            key: key.as_str(),
            value: value.as_deref(),
        });
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    // Producer construction touches librdkafka only; delivery paths are
    // covered by the in-memory publisher in the integration tests.

    #[test]
    fn test_response_producer_creation() {
        let result = ResponseTopicProducer::new("localhost:9092");
        assert!(result.is_ok());
    }

    #[test]
    fn test_error_producer_creation() {
        let result = ErrorTopicProducer::new("localhost:9092");
        assert!(result.is_ok());
    }
}
