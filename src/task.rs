//! Sink task pipeline
//!
//! One task owns the whole per-record pipeline: value codec, header
//! forwarder, credential provider, HTTP client, retry policy, and the two
//! side-topic publishers. Records are processed strictly sequentially in
//! batch order; per source partition HTTP calls therefore go out in offset
//! order, and the single-in-flight response producer preserves that order on
//! the response topic.
//!
//! The per-record state machine: null values short-circuit per
//! `behavior.on.null.values` (the error topic, when enabled, overrides a
//! `fail` setting); conversion faults terminate before any HTTP attempt; the
//! retry loop re-materializes credentials on every attempt so rotated tokens
//! take effect; terminal responses are echoed to the response topic before
//! any error record is emitted; and a batch failure is surfaced to the
//! framework only when the error topic cannot absorb the failure.

use crate::auth::AuthProvider;
use crate::client::{HttpClient, HttpRequest, HttpResponse};
use crate::codec::ValueCodec;
use crate::config::{HttpSinkConfig, OnError, OnNullValues};
use crate::error::{HttpSinkError, Result};
use crate::failure::{ErrorHandler, FailureKind};
use crate::headers::HeaderForwarder;
use crate::producer::{ErrorTopicProducer, ResponseTopicProducer};
use crate::publish::RecordPublisher;
use crate::record::SinkRecord;
use crate::response::ResponseHandler;
use crate::retry::RetryPolicy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Bounded deadline for producer teardown at task stop.
const STOP_FLUSH_DEADLINE: Duration = Duration::from_secs(10);

/// Counters kept by the task; cheap to read at any time.
#[derive(Debug, Default)]
struct TaskCounters {
    records_processed: AtomicU64,
    records_failed: AtomicU64,
    http_attempts: AtomicU64,
    response_records: AtomicU64,
    error_records: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time metrics snapshot.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TaskMetrics {
    pub records_processed: u64,
    pub records_failed: u64,
    pub http_attempts: u64,
    pub response_records: u64,
    pub error_records: u64,
    pub last_error: Option<String>,
}

/// Terminal outcome of the retry loop for one record.
enum ExecOutcome {
    /// Non-error response.
    Success(HttpResponse),
    /// 4xx/5xx outside the retryable set.
    HttpError(HttpResponse),
    /// Retryable status, attempts exhausted; the last response is kept.
    RetryExhausted { response: HttpResponse, attempts: u32 },
    /// Transport or auth fault; `exhausted` distinguishes a retried-out
    /// fault from a non-retryable one.
    Exception {
        fault: HttpSinkError,
        attempts: u32,
        exhausted: bool,
    },
}

/// The per-record processing pipeline.
pub struct HttpSinkTask {
    config: HttpSinkConfig,
    client: HttpClient,
    auth: AuthProvider,
    codec: ValueCodec,
    forwarder: HeaderForwarder,
    retry: Option<RetryPolicy>,
    response_handler: Option<ResponseHandler>,
    response_publisher: Option<Arc<dyn RecordPublisher>>,
    error_handler: Option<ErrorHandler>,
    error_publisher: Option<Arc<dyn RecordPublisher>>,
    counters: TaskCounters,
}

impl HttpSinkTask {
    /// Start a task with broker-backed side-topic producers.
    pub async fn start(config: HttpSinkConfig) -> Result<Self> {
        let response_publisher: Option<Arc<dyn RecordPublisher>> = if config.response_topic.enabled
        {
            Some(Arc::new(ResponseTopicProducer::new(&config.bootstrap_servers)?))
        } else {
            None
        };
        let error_publisher: Option<Arc<dyn RecordPublisher>> = if config.error_topic.enabled {
            Some(Arc::new(ErrorTopicProducer::new(&config.bootstrap_servers)?))
        } else {
            None
        };
        Self::with_publishers(config, response_publisher, error_publisher).await
    }

    /// Start a task with caller-supplied publishers.
    ///
    /// The seam for embedding and tests; publishers are only consulted when
    /// the corresponding topic is enabled in the config.
    pub async fn with_publishers(
        config: HttpSinkConfig,
        response_publisher: Option<Arc<dyn RecordPublisher>>,
        error_publisher: Option<Arc<dyn RecordPublisher>>,
    ) -> Result<Self> {
        info!(
            url = %config.http_api_url,
            method = %config.http_method,
            auth = config.auth.type_name(),
            response_topic = config.response_topic.enabled,
            error_topic = config.error_topic.enabled,
            "Starting HTTP sink task"
        );

        let client = HttpClient::new(&config)?;
        let auth = AuthProvider::from_config(&config.auth)?;
        // Initial credential acquisition fails the task, not the first record.
        auth.prime().await?;

        let forwarder = HeaderForwarder::new(&config.headers);
        let retry = config.retry.enabled.then(|| RetryPolicy::new(&config.retry));

        let response_handler = (config.response_topic.enabled
            && response_publisher.is_some())
        .then(|| ResponseHandler::new(&config.response_topic));
        let error_handler = (config.error_topic.enabled && error_publisher.is_some())
            .then(|| ErrorHandler::new(&config.error_topic));

        Ok(Self {
            config,
            client,
            auth,
            codec: ValueCodec::new(),
            forwarder,
            retry,
            response_handler,
            response_publisher,
            error_handler,
            error_publisher,
            counters: TaskCounters::default(),
        })
    }

    /// Process one batch of records, strictly in order.
    ///
    /// An error return is a batch failure: the framework must not commit
    /// offsets for this batch and will re-deliver it. The pipeline keeps no
    /// state across records, so re-execution of an already-forwarded record
    /// is safe (at-least-once).
    pub async fn put(&self, records: &[SinkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        debug!(count = records.len(), "Processing batch");

        for record in records {
            match self.process_record(record).await {
                Ok(()) => {
                    self.counters.records_processed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.records_failed.fetch_add(1, Ordering::Relaxed);
                    *self.counters.last_error.lock() = Some(e.to_string());
                    error!(
                        topic = %record.topic,
                        partition = record.partition,
                        offset = record.offset,
                        error = %e,
                        "Record failed; failing batch"
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Flush both producers. Response flush failures are logged, never
    /// propagated; the upstream HTTP calls already succeeded.
    pub async fn flush(&self) {
        if let Some(publisher) = &self.response_publisher {
            if let Err(e) = publisher.flush(STOP_FLUSH_DEADLINE).await {
                error!(error = %e, "Response producer flush failed");
            }
        }
        if let Some(publisher) = &self.error_publisher {
            // Best-effort by contract; errors are already swallowed inside.
            let _ = publisher.flush(STOP_FLUSH_DEADLINE).await;
        }
    }

    /// Stop the task: flush producers with a bounded deadline and release
    /// the HTTP client and credential provider.
    pub async fn stop(&self) {
        info!("Stopping HTTP sink task");
        self.flush().await;
        info!("HTTP sink task stopped");
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> TaskMetrics {
        TaskMetrics {
            records_processed: self.counters.records_processed.load(Ordering::Relaxed),
            records_failed: self.counters.records_failed.load(Ordering::Relaxed),
            http_attempts: self.counters.http_attempts.load(Ordering::Relaxed),
            response_records: self.counters.response_records.load(Ordering::Relaxed),
            error_records: self.counters.error_records.load(Ordering::Relaxed),
            last_error: self.counters.last_error.lock().clone(),
        }
    }

    async fn process_record(&self, record: &SinkRecord) -> Result<()> {
        debug!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            "Processing record"
        );

        if record.is_null_value() {
            return self.handle_null_value(record).await;
        }

        let body = match self.codec.encode(record) {
            Ok(body) => body,
            Err(fault) => return self.handle_build_failure(record, fault).await,
        };

        match self.execute_with_retry(record, body.into_bytes()).await {
            ExecOutcome::Success(response) => {
                debug!(
                    status = response.status,
                    elapsed_ms = response.elapsed_ms,
                    "HTTP request completed"
                );
                self.publish_response(&response, record).await;
                Ok(())
            }
            ExecOutcome::HttpError(response) => {
                warn!(
                    status = response.status,
                    topic = %record.topic,
                    offset = record.offset,
                    "HTTP request returned error status"
                );
                self.publish_response(&response, record).await;

                if self.error_topic_active() {
                    self.emit_error(
                        record,
                        FailureKind::HttpError,
                        &format!("HTTP request returned error status: {}", response.status),
                        Some(&response),
                        0,
                    )
                    .await;
                    return Ok(());
                }
                match self.config.behavior.on_error {
                    OnError::Fail => Err(HttpSinkError::HttpStatus {
                        status: response.status,
                        message: response.body.unwrap_or_default(),
                    }),
                    OnError::Log => {
                        error!(
                            status = response.status,
                            body = response.body.as_deref().unwrap_or(""),
                            "HTTP error ignored per behavior.on.error"
                        );
                        Ok(())
                    }
                }
            }
            ExecOutcome::RetryExhausted { response, attempts } => {
                error!(
                    status = response.status,
                    attempts = attempts,
                    topic = %record.topic,
                    offset = record.offset,
                    "HTTP request failed after exhausting retries"
                );
                // The last failed response is still echoed; downstream
                // consumers see it alongside the error record.
                self.publish_response(&response, record).await;

                if self.error_topic_active() {
                    self.emit_error(
                        record,
                        FailureKind::RetryExhausted,
                        &format!("HTTP request failed after {} attempts", attempts),
                        Some(&response),
                        attempts,
                    )
                    .await;
                    return Ok(());
                }
                match self.config.behavior.on_error {
                    OnError::Fail => Err(HttpSinkError::HttpStatus {
                        status: response.status,
                        message: response.body.unwrap_or_default(),
                    }),
                    OnError::Log => Ok(()),
                }
            }
            ExecOutcome::Exception {
                fault,
                attempts,
                exhausted,
            } => {
                error!(
                    attempts = attempts,
                    exhausted = exhausted,
                    topic = %record.topic,
                    offset = record.offset,
                    error = %fault,
                    "HTTP request failed with exception"
                );
                if self.error_topic_active() {
                    let kind = if exhausted {
                        FailureKind::RetryExhausted
                    } else {
                        FailureKind::HttpException
                    };
                    self.emit_error(record, kind, &fault.to_string(), None, attempts)
                        .await;
                    return Ok(());
                }
                Err(fault)
            }
        }
    }

    /// Retry loop: credentials are re-materialized per attempt, the sleep is
    /// a plain cancellable tokio sleep, and the policy only ever sees the
    /// 0-based attempt index.
    async fn execute_with_retry(&self, record: &SinkRecord, body: Vec<u8>) -> ExecOutcome {
        let mut attempt: u32 = 0;

        loop {
            let attempts_made = attempt + 1;
            self.counters.http_attempts.fetch_add(1, Ordering::Relaxed);

            let material = match self.auth.materialize().await {
                Ok(material) => material,
                Err(fault) => {
                    // Auth faults are terminal; no request went out on this
                    // attempt.
                    return ExecOutcome::Exception {
                        fault,
                        attempts: attempts_made,
                        exhausted: false,
                    };
                }
            };

            let mut request = HttpRequest::new(
                self.config.http_method,
                self.config.http_api_url.clone(),
            )
            .headers(self.forwarder.forward(&record.headers))
            .headers(material.headers)
            .body(body.clone());
            for (name, value) in material.query_params {
                request = request.query_param(name, value);
            }

            match self.client.execute(&request).await {
                Ok(response) if !response.is_error() => {
                    if attempt > 0 {
                        info!(
                            attempts = attempts_made,
                            topic = %record.topic,
                            offset = record.offset,
                            "HTTP request succeeded after retry"
                        );
                    }
                    return ExecOutcome::Success(response);
                }
                Ok(response) => {
                    if let Some(policy) = &self.retry {
                        if policy.should_retry_status(response.status) {
                            if policy.has_more_attempts(attempt) {
                                let delay = policy.delay_ms(attempt);
                                warn!(
                                    status = response.status,
                                    attempt = attempts_made,
                                    delay_ms = delay,
                                    topic = %record.topic,
                                    offset = record.offset,
                                    "Retrying after retryable status"
                                );
                                tokio::time::sleep(Duration::from_millis(delay)).await;
                                attempt += 1;
                                continue;
                            }
                            return ExecOutcome::RetryExhausted {
                                response,
                                attempts: attempts_made,
                            };
                        }
                    }
                    return ExecOutcome::HttpError(response);
                }
                Err(fault) => {
                    if let Some(policy) = &self.retry {
                        if policy.should_retry_error(&fault) {
                            if policy.has_more_attempts(attempt) {
                                let delay = policy.delay_ms(attempt);
                                warn!(
                                    attempt = attempts_made,
                                    delay_ms = delay,
                                    error = %fault,
                                    topic = %record.topic,
                                    offset = record.offset,
                                    "Retrying after transport fault"
                                );
                                tokio::time::sleep(Duration::from_millis(delay)).await;
                                attempt += 1;
                                continue;
                            }
                            return ExecOutcome::Exception {
                                fault,
                                attempts: attempts_made,
                                exhausted: true,
                            };
                        }
                    }
                    return ExecOutcome::Exception {
                        fault,
                        attempts: attempts_made,
                        exhausted: false,
                    };
                }
            }
        }
    }

    async fn handle_null_value(&self, record: &SinkRecord) -> Result<()> {
        warn!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            "Null value encountered"
        );

        // The error topic absorbs null values even under on.null.values=fail.
        if self.error_topic_active() {
            self.emit_error(record, FailureKind::NullValue, "Null record value", None, 0)
                .await;
            return Ok(());
        }

        match self.config.behavior.on_null_values {
            OnNullValues::Ignore => {
                debug!(offset = record.offset, "Ignoring null value");
                Ok(())
            }
            OnNullValues::Fail => Err(HttpSinkError::NullValue {
                topic: record.topic.clone(),
                partition: record.partition,
                offset: record.offset,
            }),
        }
    }

    async fn handle_build_failure(&self, record: &SinkRecord, fault: HttpSinkError) -> Result<()> {
        error!(
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            error = %fault,
            "Failed to build HTTP request"
        );

        if self.error_topic_active() {
            let kind = match &fault {
                HttpSinkError::Conversion(_) | HttpSinkError::NullValue { .. } => {
                    FailureKind::ConversionError
                }
                _ => FailureKind::ProcessingError,
            };
            self.emit_error(record, kind, &fault.to_string(), None, 0).await;
            return Ok(());
        }
        Err(fault)
    }

    fn error_topic_active(&self) -> bool {
        self.error_handler.is_some() && self.error_publisher.is_some()
    }

    /// Echo a terminal response to the response topic. Failures are logged
    /// and dropped: the HTTP call already succeeded, so the record is
    /// processed either way and the HTTP request is never re-issued.
    async fn publish_response(&self, response: &HttpResponse, record: &SinkRecord) {
        let (handler, publisher) = match (&self.response_handler, &self.response_publisher) {
            (Some(handler), Some(publisher)) => (handler, publisher),
            _ => return,
        };

        let out = handler.build(response, record);
        let topic = out.topic.clone();
        match publisher.publish(out).await {
            Ok(()) => {
                self.counters.response_records.fetch_add(1, Ordering::Relaxed);
                debug!(topic = %topic, status = response.status, "Response published");
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "Failed to publish response record");
            }
        }
    }

    /// Emit one error record, fire-and-forget. Never raises, never emits a
    /// second error record for the same failure.
    async fn emit_error(
        &self,
        record: &SinkRecord,
        kind: FailureKind,
        message: &str,
        response: Option<&HttpResponse>,
        retry_count: u32,
    ) {
        let (handler, publisher) = match (&self.error_handler, &self.error_publisher) {
            (Some(handler), Some(publisher)) => (handler, publisher),
            _ => return,
        };

        let out = handler.build(record, kind, message, response, retry_count);
        let topic = out.topic.clone();
        match publisher.publish(out).await {
            Ok(()) => {
                self.counters.error_records.fetch_add(1, Ordering::Relaxed);
                debug!(topic = %topic, error_type = %kind, "Error record emitted");
            }
            Err(e) => {
                error!(topic = %topic, error = %e, "Failed to publish error record");
            }
        }
    }
}
