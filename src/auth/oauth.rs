//! OAuth2 client-credentials flow
//!
//! Acquires bearer tokens by POSTing a form-encoded
//! `grant_type=client_credentials` request against the configured token
//! endpoint, caching the token until it enters the expiry buffer. Reads hit a
//! `parking_lot` read lock only; refreshes are single-flight behind a tokio
//! mutex so concurrent callers wait on the in-flight refresh instead of
//! stampeding the token endpoint. The provider owns its own small HTTP client
//! so token traffic never couples to the sink endpoint's timeouts or pool.

use crate::error::{HttpSinkError, Result};
use parking_lot::RwLock;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default token lifetime when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECONDS: u64 = 3600;

/// Timeouts for token requests; independent of the sink endpoint settings.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    /// Hard expiry reported by the endpoint.
    expires_at_ms: i64,
    /// Expiry minus the configured buffer; refresh once now passes this.
    refresh_after_ms: i64,
}

impl CachedToken {
    fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms < self.refresh_after_ms
    }

    fn is_usable(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// Cached OAuth2 client-credentials token source.
pub struct OAuth2ClientCredentials {
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
    buffer_ms: i64,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
    refresh_lock: Mutex<()>,
}

impl OAuth2ClientCredentials {
    pub fn new(
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
        expiry_buffer_seconds: u64,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(TOKEN_REQUEST_TIMEOUT)
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HttpSinkError::auth(format!("failed to build token client: {}", e)))?;

        info!(
            token_url = %token_url,
            client_id = %client_id,
            scope = ?scope,
            buffer_seconds = expiry_buffer_seconds,
            "OAuth2 client credentials configured"
        );

        Ok(Self {
            token_url,
            client_id,
            client_secret,
            scope,
            buffer_ms: expiry_buffer_seconds as i64 * 1000,
            http,
            token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Return a bearer token, refreshing when the cached one is stale.
    ///
    /// Invariant on success: the returned token's hard expiry is in the
    /// future. A refresh failure degrades to the cached token while that
    /// token is still inside its hard lifetime; otherwise it is an auth
    /// fault, which the retry policy treats as terminal.
    pub async fn bearer_token(&self) -> Result<String> {
        let now = now_ms();

        // Hot path: no lock contention while the token is fresh.
        if let Some(token) = self.token.read().as_ref() {
            if token.is_fresh(now) {
                return Ok(token.access_token.clone());
            }
        }

        // Single-flight refresh; concurrent callers queue here and pick up
        // the refreshed token from the double-check.
        let _guard = self.refresh_lock.lock().await;
        let now = now_ms();
        if let Some(token) = self.token.read().as_ref() {
            if token.is_fresh(now) {
                return Ok(token.access_token.clone());
            }
        }

        match self.fetch_token().await {
            Ok(token) => {
                let access_token = token.access_token.clone();
                *self.token.write() = Some(token);
                Ok(access_token)
            }
            Err(e) => {
                let cached = self.token.read().clone();
                match cached {
                    Some(token) if token.is_usable(now) => {
                        warn!(
                            error = %e,
                            "OAuth2 token refresh failed; continuing with still-valid cached token"
                        );
                        Ok(token.access_token)
                    }
                    _ => Err(e),
                }
            }
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        debug!(token_url = %self.token_url, "Fetching OAuth2 access token");

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| HttpSinkError::auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpSinkError::auth(format!(
                "token request failed: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| HttpSinkError::auth(format!("invalid token response: {}", e)))?;

        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| HttpSinkError::auth("no access_token in token response"))?;

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS);
        let now = now_ms();
        let expires_at_ms = now + expires_in as i64 * 1000;

        info!(expires_in = expires_in, "OAuth2 token obtained");

        Ok(CachedToken {
            access_token,
            expires_at_ms,
            refresh_after_ms: expires_at_ms - self.buffer_ms,
        })
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
