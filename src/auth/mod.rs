//! Request authentication
//!
//! Credential providers for outbound requests. The scheme set is closed
//! (none, basic, bearer, api-key, oauth2 client credentials), so the provider
//! is a sum type with a single `materialize` operation rather than a trait
//! object. Static schemes precompute their header at construction; OAuth2
//! delegates to the cached, refresh-aware flow in [`oauth`].

pub mod oauth;

use crate::config::{ApiKeyLocation, AuthConfig};
use crate::error::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::info;

pub use oauth::OAuth2ClientCredentials;

/// Headers and query parameters to attach to one outbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMaterial {
    pub headers: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
}

impl AuthMaterial {
    fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            headers: vec![(name.into(), value.into())],
            query_params: Vec::new(),
        }
    }

    fn query(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            headers: Vec::new(),
            query_params: vec![(name.into(), value.into())],
        }
    }
}

/// Credential provider, one variant per scheme.
pub enum AuthProvider {
    None,
    Basic {
        /// Precomputed `Basic base64(user:pass)` value.
        authorization: String,
    },
    Bearer {
        authorization: String,
    },
    ApiKeyHeader {
        name: String,
        value: String,
    },
    ApiKeyQuery {
        name: String,
        value: String,
    },
    OAuth2(OAuth2ClientCredentials),
}

impl AuthProvider {
    /// Build the provider from validated configuration.
    pub fn from_config(auth: &AuthConfig) -> Result<Self> {
        let provider = match auth {
            AuthConfig::None => AuthProvider::None,
            AuthConfig::Basic { username, password } => {
                let encoded = BASE64.encode(format!("{}:{}", username, password).as_bytes());
                info!(username = %username, "Basic authentication configured");
                AuthProvider::Basic {
                    authorization: format!("Basic {}", encoded),
                }
            }
            AuthConfig::Bearer { token } => AuthProvider::Bearer {
                authorization: format!("Bearer {}", token),
            },
            AuthConfig::ApiKey {
                name,
                value,
                location,
            } => {
                info!(name = %name, location = ?location, "API key authentication configured");
                match location {
                    ApiKeyLocation::Header => AuthProvider::ApiKeyHeader {
                        name: name.clone(),
                        value: value.clone(),
                    },
                    ApiKeyLocation::Query => AuthProvider::ApiKeyQuery {
                        name: name.clone(),
                        value: value.clone(),
                    },
                }
            }
            AuthConfig::OAuth2 {
                token_url,
                client_id,
                client_secret,
                scope,
                expiry_buffer_seconds,
            } => AuthProvider::OAuth2(OAuth2ClientCredentials::new(
                token_url.clone(),
                client_id.clone(),
                client_secret.clone(),
                scope.clone(),
                *expiry_buffer_seconds,
            )?),
        };
        Ok(provider)
    }

    /// Produce the headers and query parameters for one request attempt.
    ///
    /// Static schemes never fail. OAuth2 refreshes a stale token under a
    /// single-flight lock and raises an auth fault only when no usable token
    /// can be obtained at all.
    pub async fn materialize(&self) -> Result<AuthMaterial> {
        match self {
            AuthProvider::None => Ok(AuthMaterial::default()),
            AuthProvider::Basic { authorization } | AuthProvider::Bearer { authorization } => {
                Ok(AuthMaterial::header("Authorization", authorization.clone()))
            }
            AuthProvider::ApiKeyHeader { name, value } => {
                Ok(AuthMaterial::header(name.clone(), value.clone()))
            }
            AuthProvider::ApiKeyQuery { name, value } => {
                Ok(AuthMaterial::query(name.clone(), value.clone()))
            }
            AuthProvider::OAuth2(provider) => {
                let token = provider.bearer_token().await?;
                Ok(AuthMaterial::header("Authorization", format!("Bearer {}", token)))
            }
        }
    }

    /// Eagerly acquire credentials at task start so misconfiguration fails
    /// the task instead of the first record. No-op for static schemes.
    pub async fn prime(&self) -> Result<()> {
        if let AuthProvider::OAuth2(provider) = self {
            provider.bearer_token().await?;
        }
        Ok(())
    }
}
