//! HTTP client wrapper
//!
//! Thin wrapper over a pooled `reqwest` client. Executes exactly one attempt
//! per call and reports `{status, headers, body, elapsed_ms}` or a transport
//! fault; retries are driven entirely by the task's retry loop, never by the
//! HTTP layer. Redirects are followed (same- and cross-scheme HTTPS, limit
//! 10).

use crate::config::HttpSinkConfig;
use crate::error::{HttpSinkError, Result};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Supported HTTP methods for record forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("Unsupported HTTP method: {}", other)),
        }
    }
}

/// One outbound request, built fresh per record (and rebuilt per attempt so
/// rotated credentials take effect).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Header name/value pairs; duplicates were already comma-merged upstream.
    pub headers: Vec<(String, String)>,
    /// Query parameters appended to the URL (api-key query auth).
    pub query_params: Vec<(String, String)>,
    /// UTF-8 body bytes, absent for body-less DELETE.
    pub body: Option<Vec<u8>>,
    pub content_type: String,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            body: None,
            content_type: "application/json".to_string(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns true if any header already sets the given name
    /// (case-insensitive, per HTTP).
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// One HTTP response. Status 0 is the transport-failure sentinel used by the
/// task when it materializes an exception outcome.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers; for repeated names the last value wins.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub elapsed_ms: u64,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// 4xx or 5xx.
    pub fn is_error(&self) -> bool {
        self.is_client_error() || self.is_server_error()
    }
}

/// Pooled HTTP client owned by the task for its whole lifetime.
///
/// Thread-safe; `execute` borrows immutably and may be called concurrently,
/// though the task itself processes records sequentially.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build the client from endpoint configuration.
    pub fn new(config: &HttpSinkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connection_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_max_idle_per_host(config.max_connections_per_route)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| {
                HttpSinkError::transport(format!("failed to build HTTP client: {}", e), false)
            })?;

        debug!(
            connect_timeout_ms = config.connection_timeout_ms,
            request_timeout_ms = config.request_timeout_ms,
            max_per_route = config.max_connections_per_route,
            max_total = config.max_connections_total,
            "HTTP client initialized"
        );

        Ok(Self { client })
    }

    /// Execute one request and collect the full response.
    ///
    /// Transport failures (connect, timeout, read/write) map to retryable
    /// faults; request-construction failures are non-retryable.
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let started = Instant::now();

        let mut builder = match request.method {
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        if !request.query_params.is_empty() {
            builder = builder.query(&request.query_params);
        }

        // Last writer wins on duplicate names, so credential headers override
        // forwarded headers of the same name.
        let mut header_map = reqwest::header::HeaderMap::new();
        for (name, value) in &request.headers {
            match (
                reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                reqwest::header::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    header_map.insert(name, value);
                }
                _ => warn!(header = %name, "Skipping header with invalid name or value"),
            }
        }

        // Content type only when a body is present and nothing upstream
        // already set one.
        if request.body.is_some() && !header_map.contains_key(reqwest::header::CONTENT_TYPE) {
            if let Ok(value) = reqwest::header::HeaderValue::from_str(&request.content_type) {
                header_map.insert(reqwest::header::CONTENT_TYPE, value);
            }
        }
        builder = builder.headers(header_map);

        match (&request.body, request.method) {
            (Some(body), _) => builder = builder.body(body.clone()),
            // Empty body for body-less POST/PUT; DELETE goes out without one.
            (None, HttpMethod::Post) | (None, HttpMethod::Put) => {
                builder = builder.body(Vec::new());
            }
            (None, HttpMethod::Delete) => {}
        }

        debug!(method = %request.method, url = %request.url, "Executing HTTP request");

        let response = builder.send().await.map_err(|e| {
            let elapsed = started.elapsed().as_millis() as u64;
            error!(
                method = %request.method,
                url = %request.url,
                elapsed_ms = elapsed,
                error = %e,
                "HTTP request failed"
            );
            map_transport_error(&e)
        })?;

        let status = response.status().as_u16();
        let mut headers = Vec::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                let key = name.as_str().to_string();
                // Last value wins for repeated names.
                if let Some(existing) = headers.iter_mut().find(|(n, _)| *n == key) {
                    existing.1 = text.to_string();
                } else {
                    headers.push((key, text.to_string()));
                }
            }
        }

        let body = response
            .text()
            .await
            .map(|s| if s.is_empty() { None } else { Some(s) })
            .map_err(|e| map_transport_error(&e))?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            status = status,
            elapsed_ms = elapsed_ms,
            body_len = body.as_ref().map(|b| b.len()).unwrap_or(0),
            "HTTP response received"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
            elapsed_ms,
        })
    }
}

/// Classify a reqwest failure. Timeouts, connection failures, and mid-stream
/// IO errors are retryable; everything else (bad URL, builder misuse) is not.
fn map_transport_error(e: &reqwest::Error) -> HttpSinkError {
    let retryable = e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode();
    HttpSinkError::transport(e.to_string(), retryable)
}
