//! OAuth2 client-credentials flow against a local token endpoint.

mod common;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use common::{CapturePublisher, MockEndpoint};
use http_sink_connector::auth::OAuth2ClientCredentials;
use http_sink_connector::{
    HttpSinkConfig, HttpSinkError, HttpSinkTask, RecordPublisher, RecordValue, SinkRecord,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Token endpoint issuing `t1`, `t2`, ... unless a scripted response is
/// queued.
struct TokenEndpoint {
    posts: Mutex<Vec<(String, String)>>,
    script: Mutex<VecDeque<(u16, String)>>,
    counter: AtomicU64,
    expires_in: u64,
}

impl TokenEndpoint {
    fn new(expires_in: u64) -> Arc<Self> {
        Arc::new(Self {
            posts: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            counter: AtomicU64::new(0),
            expires_in,
        })
    }

    fn script(&self, responses: &[(u16, &str)]) {
        let mut script = self.script.lock().unwrap();
        for (status, body) in responses {
            script.push_back((*status, body.to_string()));
        }
    }

    fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }

    async fn serve(self: Arc<Self>) -> String {
        let app = Router::new()
            .route("/token", post(token_handler))
            .with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind token endpoint");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}/token", addr)
    }
}

async fn token_handler(
    State(endpoint): State<Arc<TokenEndpoint>>,
    headers: axum::http::HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    endpoint.posts.lock().unwrap().push((content_type, body));

    if let Some((status, body)) = endpoint.script.lock().unwrap().pop_front() {
        return (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        );
    }

    let n = endpoint.counter.fetch_add(1, Ordering::SeqCst) + 1;
    (
        StatusCode::OK,
        format!(
            "{{\"access_token\":\"t{}\",\"token_type\":\"Bearer\",\"expires_in\":{}}}",
            n, endpoint.expires_in
        ),
    )
}

fn oauth_props(url: &str, token_url: &str, buffer_seconds: u64) -> HashMap<String, String> {
    let mut props = HashMap::new();
    props.insert("http.api.url".to_string(), url.to_string());
    props.insert("auth.type".to_string(), "oauth2".to_string());
    props.insert("auth.oauth2.token.url".to_string(), token_url.to_string());
    props.insert("auth.oauth2.client.id".to_string(), "cid".to_string());
    props.insert("auth.oauth2.client.secret".to_string(), "csecret".to_string());
    props.insert(
        "auth.oauth2.token.expiry.buffer.seconds".to_string(),
        buffer_seconds.to_string(),
    );
    props
}

async fn start_task(props: &HashMap<String, String>) -> http_sink_connector::Result<HttpSinkTask> {
    let config = HttpSinkConfig::from_props(props)?;
    HttpSinkTask::with_publishers(config, None, None).await
}

// ---- S7: short-lived tokens refresh between records ----

#[tokio::test]
async fn short_lived_token_refreshes_between_records() {
    let token_endpoint = TokenEndpoint::new(1).serve_pair().await;
    let (token_ep, token_url) = token_endpoint;
    let endpoint = MockEndpoint::ok("ok");
    let url = endpoint.clone().serve().await;

    let task = start_task(&oauth_props(&url, &token_url, 0)).await.unwrap();

    task.put(&[SinkRecord::new("events", 0, 1, RecordValue::String("{}".into()))])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    task.put(&[SinkRecord::new("events", 0, 2, RecordValue::String("{}".into()))])
        .await
        .unwrap();

    // Exactly two token POSTs and two distinct Authorization values.
    assert_eq!(token_ep.post_count(), 2);
    let requests = endpoint.requests();
    assert_eq!(requests.len(), 2);
    let auth1 = requests[0].headers.get("authorization").unwrap();
    let auth2 = requests[1].headers.get("authorization").unwrap();
    assert_eq!(auth1, "Bearer t1");
    assert_eq!(auth2, "Bearer t2");

    // The token POST is a form-encoded client-credentials grant.
    let (content_type, body) = &token_ep.posts()[0];
    assert!(content_type.starts_with("application/x-www-form-urlencoded"));
    assert!(body.contains("grant_type=client_credentials"));
    assert!(body.contains("client_id=cid"));
    assert!(body.contains("client_secret=csecret"));
}

// ---- Long-lived tokens are cached ----

#[tokio::test]
async fn long_lived_token_is_cached() {
    let (token_ep, token_url) = TokenEndpoint::new(3600).serve_pair().await;
    let endpoint = MockEndpoint::ok("ok");
    let url = endpoint.clone().serve().await;

    let task = start_task(&oauth_props(&url, &token_url, 300)).await.unwrap();
    for offset in 0..3 {
        task.put(&[SinkRecord::new(
            "events",
            0,
            offset,
            RecordValue::String("{}".into()),
        )])
        .await
        .unwrap();
    }

    assert_eq!(token_ep.post_count(), 1);
    for request in endpoint.requests() {
        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer t1");
    }
}

// ---- Scope is sent when configured ----

#[tokio::test]
async fn scope_is_included_in_token_request() {
    let (token_ep, token_url) = TokenEndpoint::new(3600).serve_pair().await;
    let endpoint = MockEndpoint::ok("ok");
    let url = endpoint.clone().serve().await;

    let mut props = oauth_props(&url, &token_url, 300);
    props.insert("auth.oauth2.scope".to_string(), "read write".to_string());
    let task = start_task(&props).await.unwrap();
    task.put(&[SinkRecord::new("events", 0, 0, RecordValue::String("{}".into()))])
        .await
        .unwrap();

    let (_, body) = &token_ep.posts()[0];
    assert!(body.contains("scope=read+write") || body.contains("scope=read%20write"));
}

// ---- Refresh failure degrades to the still-valid cached token ----

#[tokio::test]
async fn refresh_failure_degrades_to_cached_token() {
    let (token_ep, token_url) = TokenEndpoint::new(3600).serve_pair().await;

    // Buffer equals the full lifetime, so every call is a refresh attempt,
    // but the cached token stays inside its hard expiry.
    let provider = OAuth2ClientCredentials::new(
        token_url,
        "cid".to_string(),
        "csecret".to_string(),
        None,
        3600,
    )
    .unwrap();

    let first = provider.bearer_token().await.unwrap();
    assert_eq!(first, "t1");

    token_ep.script(&[(500, "token service down")]);
    let second = provider.bearer_token().await.unwrap();
    assert_eq!(second, "t1");
    assert_eq!(token_ep.post_count(), 2);
}

// ---- No token at all fails the task start ----

#[tokio::test]
async fn unreachable_token_endpoint_fails_start() {
    let (token_ep, token_url) = TokenEndpoint::new(3600).serve_pair().await;
    token_ep.script(&[(500, "nope"), (500, "nope"), (500, "nope")]);
    let endpoint = MockEndpoint::ok("ok");
    let url = endpoint.clone().serve().await;

    let err = start_task(&oauth_props(&url, &token_url, 300))
        .await
        .err()
        .expect("start should fail");
    assert!(matches!(err, HttpSinkError::Auth(_)));
    assert_eq!(endpoint.request_count(), 0);
}

// ---- Concurrent callers share one in-flight refresh ----

#[tokio::test]
async fn concurrent_refresh_is_single_flight() {
    let (token_ep, token_url) = TokenEndpoint::new(3600).serve_pair().await;

    let provider = Arc::new(
        OAuth2ClientCredentials::new(token_url, "cid".to_string(), "csecret".to_string(), None, 300)
            .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move { provider.bearer_token().await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "t1");
    }
    assert_eq!(token_ep.post_count(), 1);
}

// ---- Bearer tokens never leak into error records ----

#[tokio::test]
async fn bearer_token_never_enters_error_records() {
    let (_token_ep, token_url) = TokenEndpoint::new(3600).serve_pair().await;
    let endpoint = MockEndpoint::with_default(404, "not found");
    let url = endpoint.clone().serve().await;

    let mut props = oauth_props(&url, &token_url, 300);
    props.insert("error.topic.enabled".to_string(), "true".to_string());
    props.insert("error.topic.name".to_string(), "errors".to_string());

    let errors = CapturePublisher::new();
    let config = HttpSinkConfig::from_props(&props).unwrap();
    let task = HttpSinkTask::with_publishers(
        config,
        None,
        Some(errors.clone() as Arc<dyn RecordPublisher>),
    )
    .await
    .unwrap();

    task.put(&[SinkRecord::new("events", 0, 1, RecordValue::String("{}".into()))])
        .await
        .unwrap();

    let records = errors.records();
    assert_eq!(records.len(), 1);
    let value = String::from_utf8(records[0].value.clone().unwrap()).unwrap();
    assert!(!value.contains("t1"), "token leaked into error value");
    for (name, header_value) in &records[0].headers {
        assert!(!name.eq_ignore_ascii_case("authorization"));
        if let Some(bytes) = header_value {
            let text = String::from_utf8_lossy(bytes);
            assert!(!text.contains("Bearer t1"), "token leaked into header {}", name);
        }
    }
}

/// Serve and hand back both the endpoint handle and its URL.
trait ServePair {
    #[allow(async_fn_in_trait)]
    async fn serve_pair(self) -> (Arc<TokenEndpoint>, String);
}

impl ServePair for Arc<TokenEndpoint> {
    async fn serve_pair(self) -> (Arc<TokenEndpoint>, String) {
        let url = self.clone().serve().await;
        (self, url)
    }
}
