//! Shared helpers for the integration tests: a scriptable local HTTP
//! endpoint and an in-memory record publisher.

// Each integration binary uses a different subset of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::any;
use axum::Router;
use http_sink_connector::{HttpSinkError, PublishedRecord, RecordPublisher, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One request observed by the mock endpoint.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub uri: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub at: Instant,
}

/// Scriptable HTTP endpoint. Responses pop from the script front; once the
/// script runs dry the default response repeats.
pub struct MockEndpoint {
    requests: Mutex<Vec<CapturedRequest>>,
    script: Mutex<VecDeque<(u16, String)>>,
    default_response: (u16, String),
}

impl MockEndpoint {
    pub fn ok(body: &str) -> Arc<Self> {
        Self::with_default(200, body)
    }

    pub fn with_default(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_response: (status, body.to_string()),
        })
    }

    /// Queue scripted responses served before the default kicks in.
    pub fn script(&self, responses: &[(u16, &str)]) {
        let mut script = self.script.lock().unwrap();
        for (status, body) in responses {
            script.push_back((*status, body.to_string()));
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Bind on an ephemeral port and serve until the test process exits.
    pub async fn serve(self: Arc<Self>) -> String {
        let app = Router::new()
            .route("/hook", any(capture_handler))
            .with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock endpoint");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}/hook", addr)
    }
}

async fn capture_handler(
    State(endpoint): State<Arc<MockEndpoint>>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let header_map: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    endpoint.requests.lock().unwrap().push(CapturedRequest {
        method: method.to_string(),
        uri: uri.to_string(),
        headers: header_map,
        body: String::from_utf8_lossy(&body).to_string(),
        at: Instant::now(),
    });

    let (status, response_body) = endpoint
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| endpoint.default_response.clone());

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        response_body,
    )
}

/// In-memory publisher capturing records, optionally failing every send.
pub struct CapturePublisher {
    records: Mutex<Vec<PublishedRecord>>,
    fail: bool,
}

impl CapturePublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn records(&self) -> Vec<PublishedRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordPublisher for CapturePublisher {
    async fn publish(&self, record: PublishedRecord) -> Result<()> {
        if self.fail {
            return Err(HttpSinkError::publish("injected publisher failure"));
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn flush(&self, _deadline: Duration) -> Result<()> {
        Ok(())
    }
}
