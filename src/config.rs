//! Connector configuration
//!
//! Configuration arrives from the host framework as flat string properties
//! (`http.api.url`, `retry.max.attempts`, ...). This module declares every
//! recognized key with its type, default and documentation, parses the
//! properties into an immutable [`HttpSinkConfig`], and enforces the
//! required/forbidden combinations at start-up so a bad deployment fails
//! fast with a descriptive error instead of at the first record.

use crate::client::HttpMethod;
use crate::error::{ConfigError, HttpSinkError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Recognized property keys.
pub const HTTP_API_URL: &str = "http.api.url";
pub const HTTP_METHOD: &str = "http.method";
pub const HTTP_REQUEST_TIMEOUT_MS: &str = "http.request.timeout.ms";
pub const HTTP_CONNECTION_TIMEOUT_MS: &str = "http.connection.timeout.ms";
pub const HTTP_MAX_CONNECTIONS_PER_ROUTE: &str = "http.max.connections.per.route";
pub const HTTP_MAX_CONNECTIONS_TOTAL: &str = "http.max.connections.total";

pub const AUTH_TYPE: &str = "auth.type";
pub const AUTH_BASIC_USERNAME: &str = "auth.basic.username";
pub const AUTH_BASIC_PASSWORD: &str = "auth.basic.password";
pub const AUTH_BEARER_TOKEN: &str = "auth.bearer.token";
pub const AUTH_APIKEY_NAME: &str = "auth.apikey.name";
pub const AUTH_APIKEY_VALUE: &str = "auth.apikey.value";
pub const AUTH_APIKEY_LOCATION: &str = "auth.apikey.location";
pub const AUTH_OAUTH2_TOKEN_URL: &str = "auth.oauth2.token.url";
pub const AUTH_OAUTH2_CLIENT_ID: &str = "auth.oauth2.client.id";
pub const AUTH_OAUTH2_CLIENT_SECRET: &str = "auth.oauth2.client.secret";
pub const AUTH_OAUTH2_SCOPE: &str = "auth.oauth2.scope";
pub const AUTH_OAUTH2_EXPIRY_BUFFER_SECONDS: &str = "auth.oauth2.token.expiry.buffer.seconds";

pub const HEADERS_FORWARD_ENABLED: &str = "headers.forward.enabled";
pub const HEADERS_FORWARD_INCLUDE: &str = "headers.forward.include";
pub const HEADERS_FORWARD_EXCLUDE: &str = "headers.forward.exclude";
pub const HEADERS_FORWARD_PREFIX: &str = "headers.forward.prefix";
pub const HEADERS_STATIC: &str = "headers.static";

pub const RESPONSE_TOPIC_ENABLED: &str = "response.topic.enabled";
pub const RESPONSE_TOPIC_NAME: &str = "response.topic.name";
pub const RESPONSE_INCLUDE_ORIGINAL_KEY: &str = "response.include.original.key";
pub const RESPONSE_INCLUDE_ORIGINAL_HEADERS: &str = "response.include.original.headers";
pub const RESPONSE_ORIGINAL_HEADERS_INCLUDE: &str = "response.original.headers.include";
pub const RESPONSE_INCLUDE_REQUEST_METADATA: &str = "response.include.request.metadata";
pub const RESPONSE_VALUE_FORMAT: &str = "response.value.format";

pub const ERROR_TOPIC_ENABLED: &str = "error.topic.enabled";
pub const ERROR_TOPIC_NAME: &str = "error.topic.name";

pub const RETRY_ENABLED: &str = "retry.enabled";
pub const RETRY_MAX_ATTEMPTS: &str = "retry.max.attempts";
pub const RETRY_BACKOFF_INITIAL_MS: &str = "retry.backoff.initial.ms";
pub const RETRY_BACKOFF_MAX_MS: &str = "retry.backoff.max.ms";
pub const RETRY_BACKOFF_MULTIPLIER: &str = "retry.backoff.multiplier";
pub const RETRY_ON_STATUS_CODES: &str = "retry.on.status.codes";

pub const BEHAVIOR_ON_NULL_VALUES: &str = "behavior.on.null.values";
pub const BEHAVIOR_ON_ERROR: &str = "behavior.on.error";

pub const KAFKA_BOOTSTRAP_SERVERS: &str = "kafka.bootstrap.servers";

/// Configuration value type for a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigType {
    String,
    Int,
    Long,
    Double,
    Boolean,
    List,
    /// Sensitive string value (masked in logs).
    Password,
}

/// Importance level for a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigImportance {
    High,
    Medium,
    Low,
}

/// Definition of a single configuration key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDef {
    pub name: String,
    pub config_type: ConfigType,
    pub default_value: Option<String>,
    pub importance: ConfigImportance,
    pub documentation: String,
    pub required: bool,
}

impl ConfigDef {
    pub fn required(
        name: impl Into<String>,
        config_type: ConfigType,
        documentation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            config_type,
            default_value: None,
            importance: ConfigImportance::High,
            documentation: documentation.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        config_type: ConfigType,
        default_value: impl Into<String>,
        documentation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            config_type,
            default_value: Some(default_value.into()),
            importance: ConfigImportance::Medium,
            documentation: documentation.into(),
            required: false,
        }
    }

    /// Optional key with no default (absence means "unset").
    pub fn opt_unset(
        name: impl Into<String>,
        config_type: ConfigType,
        documentation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            config_type,
            default_value: None,
            importance: ConfigImportance::Medium,
            documentation: documentation.into(),
            required: false,
        }
    }

    pub fn with_importance(mut self, importance: ConfigImportance) -> Self {
        self.importance = importance;
        self
    }
}

/// Result of validating a single configuration key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValidation {
    pub name: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ConfigValidation {
    fn ok(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_valid: true,
            errors: Vec::new(),
        }
    }

    fn error(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            is_valid: false,
            errors: vec![message.into()],
        }
    }
}

/// Authentication scheme, a closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    ApiKey {
        name: String,
        value: String,
        location: ApiKeyLocation,
    },
    OAuth2 {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
        expiry_buffer_seconds: u64,
    },
}

impl AuthConfig {
    /// Wire name of the scheme, as configured.
    pub fn type_name(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ApiKey { .. } => "apikey",
            AuthConfig::OAuth2 { .. } => "oauth2",
        }
    }
}

/// Where an API key is attached to the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// Header forwarding options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderForwardConfig {
    pub enabled: bool,
    /// Include globs; empty means forward all.
    pub include: Vec<String>,
    /// Exclude globs, applied after includes.
    pub exclude: Vec<String>,
    pub prefix: String,
    /// Static headers merged last; they override forwarded names.
    pub static_headers: Vec<(String, String)>,
}

/// Response topic options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTopicConfig {
    pub enabled: bool,
    /// Topic name template; `${topic}` substitutes the source topic.
    pub name: Option<String>,
    pub include_original_key: bool,
    pub include_original_headers: bool,
    /// Whitelist of original header names; empty means all.
    pub original_headers_include: Vec<String>,
    pub include_request_metadata: bool,
    pub value_format: ResponseValueFormat,
}

/// Format expectation for response-record values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseValueFormat {
    String,
    Json,
}

/// Error topic options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTopicConfig {
    pub enabled: bool,
    /// Topic name template; `${topic}` substitutes the source topic.
    pub name: Option<String>,
}

/// Retry options.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_multiplier: f64,
    pub retry_on_status_codes: Vec<u16>,
}

/// Behaviour on terminal per-record failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BehaviorConfig {
    pub on_null_values: OnNullValues,
    pub on_error: OnError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnNullValues {
    Fail,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    Fail,
    Log,
}

/// Validated, immutable connector configuration.
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    pub http_api_url: String,
    pub http_method: HttpMethod,
    pub request_timeout_ms: u64,
    pub connection_timeout_ms: u64,
    pub max_connections_per_route: usize,
    pub max_connections_total: usize,
    pub auth: AuthConfig,
    pub headers: HeaderForwardConfig,
    pub response_topic: ResponseTopicConfig,
    pub error_topic: ErrorTopicConfig,
    pub retry: RetryConfig,
    pub behavior: BehaviorConfig,
    pub bootstrap_servers: String,
}

impl HttpSinkConfig {
    /// Parse and validate flat string properties into a config.
    ///
    /// Fails fast with a descriptive [`ConfigError`] on unknown enum values,
    /// unparseable numbers, out-of-range values, or missing required
    /// combinations.
    pub fn from_props(props: &HashMap<String, String>) -> Result<Self> {
        let http_api_url = require_string(props, HTTP_API_URL)?;
        let http_method = get_string(props, HTTP_METHOD, "POST")
            .parse::<HttpMethod>()
            .map_err(|e| HttpSinkError::config(HTTP_METHOD, e))?;
        let request_timeout_ms = get_u64(props, HTTP_REQUEST_TIMEOUT_MS, 30_000)?;
        let connection_timeout_ms = get_u64(props, HTTP_CONNECTION_TIMEOUT_MS, 5_000)?;
        if request_timeout_ms < 1000 {
            return Err(HttpSinkError::config(
                HTTP_REQUEST_TIMEOUT_MS,
                "must be at least 1000",
            ));
        }
        if connection_timeout_ms < 1000 {
            return Err(HttpSinkError::config(
                HTTP_CONNECTION_TIMEOUT_MS,
                "must be at least 1000",
            ));
        }
        let max_connections_per_route = get_u64(props, HTTP_MAX_CONNECTIONS_PER_ROUTE, 20)? as usize;
        let max_connections_total = get_u64(props, HTTP_MAX_CONNECTIONS_TOTAL, 100)? as usize;
        if max_connections_per_route == 0 || max_connections_total == 0 {
            return Err(HttpSinkError::config(
                HTTP_MAX_CONNECTIONS_TOTAL,
                "connection limits must be at least 1",
            ));
        }

        let auth = parse_auth(props)?;

        let headers = HeaderForwardConfig {
            enabled: get_bool(props, HEADERS_FORWARD_ENABLED, true)?,
            include: get_list(props, HEADERS_FORWARD_INCLUDE),
            exclude: get_list(props, HEADERS_FORWARD_EXCLUDE),
            prefix: get_string(props, HEADERS_FORWARD_PREFIX, ""),
            static_headers: parse_static_headers(&get_string(props, HEADERS_STATIC, ""))?,
        };

        let response_topic = ResponseTopicConfig {
            enabled: get_bool(props, RESPONSE_TOPIC_ENABLED, false)?,
            name: props.get(RESPONSE_TOPIC_NAME).cloned().filter(|s| !s.is_empty()),
            include_original_key: get_bool(props, RESPONSE_INCLUDE_ORIGINAL_KEY, true)?,
            include_original_headers: get_bool(props, RESPONSE_INCLUDE_ORIGINAL_HEADERS, true)?,
            original_headers_include: get_list(props, RESPONSE_ORIGINAL_HEADERS_INCLUDE),
            include_request_metadata: get_bool(props, RESPONSE_INCLUDE_REQUEST_METADATA, true)?,
            value_format: match get_string(props, RESPONSE_VALUE_FORMAT, "string").as_str() {
                "string" => ResponseValueFormat::String,
                "json" => ResponseValueFormat::Json,
                other => {
                    return Err(HttpSinkError::config(
                        RESPONSE_VALUE_FORMAT,
                        format!("must be 'string' or 'json', got '{}'", other),
                    ))
                }
            },
        };
        if response_topic.enabled && response_topic.name.is_none() {
            return Err(HttpSinkError::Config(ConfigError::missing(format!(
                "{} (required when {} is true)",
                RESPONSE_TOPIC_NAME, RESPONSE_TOPIC_ENABLED
            ))));
        }

        let error_topic = ErrorTopicConfig {
            enabled: get_bool(props, ERROR_TOPIC_ENABLED, false)?,
            name: props.get(ERROR_TOPIC_NAME).cloned().filter(|s| !s.is_empty()),
        };
        if error_topic.enabled && error_topic.name.is_none() {
            return Err(HttpSinkError::Config(ConfigError::missing(format!(
                "{} (required when {} is true)",
                ERROR_TOPIC_NAME, ERROR_TOPIC_ENABLED
            ))));
        }

        let retry = RetryConfig {
            enabled: get_bool(props, RETRY_ENABLED, true)?,
            max_attempts: get_u64(props, RETRY_MAX_ATTEMPTS, 5)? as u32,
            backoff_initial_ms: get_u64(props, RETRY_BACKOFF_INITIAL_MS, 1_000)?,
            backoff_max_ms: get_u64(props, RETRY_BACKOFF_MAX_MS, 60_000)?,
            backoff_multiplier: get_f64(props, RETRY_BACKOFF_MULTIPLIER, 2.0)?,
            retry_on_status_codes: parse_status_codes(&get_string(
                props,
                RETRY_ON_STATUS_CODES,
                "429,500,502,503,504",
            ))?,
        };
        if retry.backoff_multiplier < 1.0 {
            return Err(HttpSinkError::config(
                RETRY_BACKOFF_MULTIPLIER,
                "must be at least 1.0",
            ));
        }

        let behavior = BehaviorConfig {
            on_null_values: match get_string(props, BEHAVIOR_ON_NULL_VALUES, "fail").as_str() {
                "fail" => OnNullValues::Fail,
                "ignore" => OnNullValues::Ignore,
                other => {
                    return Err(HttpSinkError::config(
                        BEHAVIOR_ON_NULL_VALUES,
                        format!("must be 'fail' or 'ignore', got '{}'", other),
                    ))
                }
            },
            on_error: match get_string(props, BEHAVIOR_ON_ERROR, "fail").as_str() {
                "fail" => OnError::Fail,
                "log" => OnError::Log,
                other => {
                    return Err(HttpSinkError::config(
                        BEHAVIOR_ON_ERROR,
                        format!("must be 'fail' or 'log', got '{}'", other),
                    ))
                }
            },
        };

        let bootstrap_servers = get_string(props, KAFKA_BOOTSTRAP_SERVERS, "localhost:9092");

        Ok(Self {
            http_api_url,
            http_method,
            request_timeout_ms,
            connection_timeout_ms,
            max_connections_per_route,
            max_connections_total,
            auth,
            headers,
            response_topic,
            error_topic,
            retry,
            behavior,
            bootstrap_servers,
        })
    }

    /// Validate properties key by key without constructing the config.
    ///
    /// Used by the connector REST surface to report all problems at once
    /// instead of failing on the first.
    pub fn validate_props(props: &HashMap<String, String>) -> Vec<ConfigValidation> {
        let mut results = Vec::new();

        results.push(if props.contains_key(HTTP_API_URL) {
            ConfigValidation::ok(HTTP_API_URL)
        } else {
            ConfigValidation::error(
                HTTP_API_URL,
                format!("Missing required configuration: {}", HTTP_API_URL),
            )
        });

        if let Some(method) = props.get(HTTP_METHOD) {
            results.push(match method.parse::<HttpMethod>() {
                Ok(_) => ConfigValidation::ok(HTTP_METHOD),
                Err(e) => ConfigValidation::error(HTTP_METHOD, e),
            });
        }

        for key in [
            HTTP_REQUEST_TIMEOUT_MS,
            HTTP_CONNECTION_TIMEOUT_MS,
            HTTP_MAX_CONNECTIONS_PER_ROUTE,
            HTTP_MAX_CONNECTIONS_TOTAL,
            RETRY_MAX_ATTEMPTS,
            RETRY_BACKOFF_INITIAL_MS,
            RETRY_BACKOFF_MAX_MS,
            AUTH_OAUTH2_EXPIRY_BUFFER_SECONDS,
        ] {
            if let Some(value) = props.get(key) {
                results.push(match value.parse::<u64>() {
                    Ok(_) => ConfigValidation::ok(key),
                    Err(_) => {
                        ConfigValidation::error(key, format!("Invalid integer value: {}", value))
                    }
                });
            }
        }

        if let Some(value) = props.get(RETRY_BACKOFF_MULTIPLIER) {
            results.push(match value.parse::<f64>() {
                Ok(m) if m >= 1.0 => ConfigValidation::ok(RETRY_BACKOFF_MULTIPLIER),
                Ok(_) => ConfigValidation::error(RETRY_BACKOFF_MULTIPLIER, "must be at least 1.0"),
                Err(_) => ConfigValidation::error(
                    RETRY_BACKOFF_MULTIPLIER,
                    format!("Invalid double value: {}", value),
                ),
            });
        }

        // Cross-field rules surface on the key that is missing.
        if let Err(HttpSinkError::Config(e)) = Self::from_props(props) {
            let (name, message) = match &e {
                ConfigError::Missing(what) => (what.split(' ').next().unwrap_or("config"), e.to_string()),
                ConfigError::InvalidSetting { setting, .. } => (setting.as_str(), e.to_string()),
                ConfigError::Message(_) => ("config", e.to_string()),
            };
            // Don't duplicate the required-key entry emitted above.
            if name != HTTP_API_URL || props.contains_key(HTTP_API_URL) {
                results.push(ConfigValidation::error(name, message));
            }
        }

        results
    }

    /// The full set of configuration definitions understood by the connector.
    pub fn definitions() -> Vec<ConfigDef> {
        use ConfigImportance::*;
        use ConfigType::*;
        vec![
            ConfigDef::required(HTTP_API_URL, String, "HTTP endpoint URL to send records to"),
            ConfigDef::optional(HTTP_METHOD, String, "POST", "HTTP method (POST, PUT, DELETE)")
                .with_importance(High),
            ConfigDef::optional(
                HTTP_REQUEST_TIMEOUT_MS,
                Int,
                "30000",
                "Per-attempt request timeout in milliseconds (minimum 1000)",
            ),
            ConfigDef::optional(
                HTTP_CONNECTION_TIMEOUT_MS,
                Int,
                "5000",
                "TCP/TLS connection timeout in milliseconds (minimum 1000)",
            ),
            ConfigDef::optional(
                HTTP_MAX_CONNECTIONS_PER_ROUTE,
                Int,
                "20",
                "Maximum pooled connections per host",
            )
            .with_importance(Low),
            ConfigDef::optional(
                HTTP_MAX_CONNECTIONS_TOTAL,
                Int,
                "100",
                "Maximum pooled connections total",
            )
            .with_importance(Low),
            ConfigDef::optional(
                AUTH_TYPE,
                String,
                "none",
                "Authentication type (none, basic, bearer, apikey, oauth2)",
            )
            .with_importance(High),
            ConfigDef::opt_unset(AUTH_BASIC_USERNAME, String, "Username for basic authentication"),
            ConfigDef::opt_unset(AUTH_BASIC_PASSWORD, Password, "Password for basic authentication"),
            ConfigDef::opt_unset(AUTH_BEARER_TOKEN, Password, "Bearer token for authentication"),
            ConfigDef::opt_unset(AUTH_APIKEY_NAME, String, "API key header or query parameter name"),
            ConfigDef::opt_unset(AUTH_APIKEY_VALUE, Password, "API key value"),
            ConfigDef::optional(
                AUTH_APIKEY_LOCATION,
                String,
                "header",
                "API key location (header or query)",
            )
            .with_importance(Low),
            ConfigDef::opt_unset(AUTH_OAUTH2_TOKEN_URL, String, "OAuth2 token endpoint URL"),
            ConfigDef::opt_unset(AUTH_OAUTH2_CLIENT_ID, String, "OAuth2 client ID"),
            ConfigDef::opt_unset(AUTH_OAUTH2_CLIENT_SECRET, Password, "OAuth2 client secret"),
            ConfigDef::opt_unset(AUTH_OAUTH2_SCOPE, String, "OAuth2 scope (optional)")
                .with_importance(Low),
            ConfigDef::optional(
                AUTH_OAUTH2_EXPIRY_BUFFER_SECONDS,
                Int,
                "300",
                "Seconds before token expiry at which a refresh is triggered",
            )
            .with_importance(Low),
            ConfigDef::optional(
                HEADERS_FORWARD_ENABLED,
                Boolean,
                "true",
                "Forward record headers to the HTTP request",
            ),
            ConfigDef::optional(
                HEADERS_FORWARD_INCLUDE,
                List,
                "",
                "Comma-separated header globs to include (empty = all)",
            )
            .with_importance(Low),
            ConfigDef::optional(
                HEADERS_FORWARD_EXCLUDE,
                List,
                "",
                "Comma-separated header globs to exclude",
            )
            .with_importance(Low),
            ConfigDef::optional(
                HEADERS_FORWARD_PREFIX,
                String,
                "",
                "Prefix added to forwarded header names",
            )
            .with_importance(Low),
            ConfigDef::optional(
                HEADERS_STATIC,
                String,
                "",
                "Static headers added to every request (name1:value1,name2:value2)",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RESPONSE_TOPIC_ENABLED,
                Boolean,
                "false",
                "Publish HTTP responses to a broker topic",
            )
            .with_importance(High),
            ConfigDef::opt_unset(
                RESPONSE_TOPIC_NAME,
                String,
                "Response topic name; ${topic} substitutes the source topic",
            )
            .with_importance(High),
            ConfigDef::optional(
                RESPONSE_INCLUDE_ORIGINAL_KEY,
                Boolean,
                "true",
                "Carry the original record key on response records",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RESPONSE_INCLUDE_ORIGINAL_HEADERS,
                Boolean,
                "true",
                "Carry original record headers on response records",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RESPONSE_ORIGINAL_HEADERS_INCLUDE,
                List,
                "",
                "Whitelist of original header names to carry (empty = all)",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RESPONSE_INCLUDE_REQUEST_METADATA,
                Boolean,
                "true",
                "Attach status/timing/source-coordinate metadata headers",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RESPONSE_VALUE_FORMAT,
                String,
                "string",
                "Response value format (string or json); json validates parseability",
            ),
            ConfigDef::optional(
                ERROR_TOPIC_ENABLED,
                Boolean,
                "false",
                "Publish terminal per-record failures to a broker topic",
            )
            .with_importance(High),
            ConfigDef::opt_unset(
                ERROR_TOPIC_NAME,
                String,
                "Error topic name; ${topic} substitutes the source topic",
            )
            .with_importance(High),
            ConfigDef::optional(RETRY_ENABLED, Boolean, "true", "Retry failed requests"),
            ConfigDef::optional(RETRY_MAX_ATTEMPTS, Int, "5", "Maximum HTTP attempts per record"),
            ConfigDef::optional(
                RETRY_BACKOFF_INITIAL_MS,
                Long,
                "1000",
                "Initial retry backoff in milliseconds",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RETRY_BACKOFF_MAX_MS,
                Long,
                "60000",
                "Maximum retry backoff in milliseconds",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RETRY_BACKOFF_MULTIPLIER,
                Double,
                "2.0",
                "Backoff multiplier (minimum 1.0)",
            )
            .with_importance(Low),
            ConfigDef::optional(
                RETRY_ON_STATUS_CODES,
                List,
                "429,500,502,503,504",
                "HTTP status codes that trigger a retry",
            ),
            ConfigDef::optional(
                BEHAVIOR_ON_NULL_VALUES,
                String,
                "fail",
                "Behaviour for null record values (fail or ignore)",
            ),
            ConfigDef::optional(
                BEHAVIOR_ON_ERROR,
                String,
                "fail",
                "Behaviour for terminal HTTP errors (fail or log)",
            )
            .with_importance(High),
            ConfigDef::optional(
                KAFKA_BOOTSTRAP_SERVERS,
                String,
                "localhost:9092",
                "Bootstrap servers for the response/error producers",
            ),
        ]
    }
}

fn require_string(props: &HashMap<String, String>, key: &str) -> Result<String> {
    props
        .get(key)
        .filter(|s| !s.trim().is_empty())
        .cloned()
        .ok_or_else(|| HttpSinkError::config_missing(key))
}

fn get_string(props: &HashMap<String, String>, key: &str, default: &str) -> String {
    props
        .get(key)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn get_opt(props: &HashMap<String, String>, key: &str) -> Option<String> {
    props
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn get_bool(props: &HashMap<String, String>, key: &str, default: bool) -> Result<bool> {
    match props.get(key) {
        None => Ok(default),
        Some(v) => match v.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(HttpSinkError::config(
                key,
                format!("must be 'true' or 'false', got '{}'", other),
            )),
        },
    }
}

fn get_u64(props: &HashMap<String, String>, key: &str, default: u64) -> Result<u64> {
    match props.get(key) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|_| HttpSinkError::config(key, format!("invalid integer value '{}'", v))),
    }
}

fn get_f64(props: &HashMap<String, String>, key: &str, default: f64) -> Result<f64> {
    match props.get(key) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<f64>()
            .map_err(|_| HttpSinkError::config(key, format!("invalid double value '{}'", v))),
    }
}

fn get_list(props: &HashMap<String, String>, key: &str) -> Vec<String> {
    props
        .get(key)
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_status_codes(raw: &str) -> Result<Vec<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u16>().map_err(|_| {
                HttpSinkError::config(
                    RETRY_ON_STATUS_CODES,
                    format!("invalid status code '{}'", p),
                )
            })
        })
        .collect()
}

fn parse_static_headers(raw: &str) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
            _ => {
                return Err(HttpSinkError::config(
                    HEADERS_STATIC,
                    format!("expected name:value, got '{}'", part),
                ))
            }
        }
    }
    Ok(headers)
}

fn parse_auth(props: &HashMap<String, String>) -> Result<AuthConfig> {
    match get_string(props, AUTH_TYPE, "none").as_str() {
        "none" => Ok(AuthConfig::None),
        "basic" => {
            let username = get_opt(props, AUTH_BASIC_USERNAME);
            let password = get_opt(props, AUTH_BASIC_PASSWORD);
            match (username, password) {
                (Some(username), Some(password)) => Ok(AuthConfig::Basic { username, password }),
                _ => Err(HttpSinkError::config(
                    AUTH_TYPE,
                    format!(
                        "{} and {} are required when auth.type is 'basic'",
                        AUTH_BASIC_USERNAME, AUTH_BASIC_PASSWORD
                    ),
                )),
            }
        }
        "bearer" => get_opt(props, AUTH_BEARER_TOKEN)
            .map(|token| AuthConfig::Bearer { token })
            .ok_or_else(|| {
                HttpSinkError::config(
                    AUTH_TYPE,
                    format!("{} is required when auth.type is 'bearer'", AUTH_BEARER_TOKEN),
                )
            }),
        "apikey" => {
            let name = get_opt(props, AUTH_APIKEY_NAME);
            let value = get_opt(props, AUTH_APIKEY_VALUE);
            let location = match get_string(props, AUTH_APIKEY_LOCATION, "header").as_str() {
                "header" => ApiKeyLocation::Header,
                "query" => ApiKeyLocation::Query,
                other => {
                    return Err(HttpSinkError::config(
                        AUTH_APIKEY_LOCATION,
                        format!("must be 'header' or 'query', got '{}'", other),
                    ))
                }
            };
            match (name, value) {
                (Some(name), Some(value)) => Ok(AuthConfig::ApiKey {
                    name,
                    value,
                    location,
                }),
                _ => Err(HttpSinkError::config(
                    AUTH_TYPE,
                    format!(
                        "{} and {} are required when auth.type is 'apikey'",
                        AUTH_APIKEY_NAME, AUTH_APIKEY_VALUE
                    ),
                )),
            }
        }
        "oauth2" => {
            let token_url = get_opt(props, AUTH_OAUTH2_TOKEN_URL);
            let client_id = get_opt(props, AUTH_OAUTH2_CLIENT_ID);
            let client_secret = get_opt(props, AUTH_OAUTH2_CLIENT_SECRET);
            match (token_url, client_id, client_secret) {
                (Some(token_url), Some(client_id), Some(client_secret)) => Ok(AuthConfig::OAuth2 {
                    token_url,
                    client_id,
                    client_secret,
                    scope: get_opt(props, AUTH_OAUTH2_SCOPE),
                    expiry_buffer_seconds: get_u64(props, AUTH_OAUTH2_EXPIRY_BUFFER_SECONDS, 300)?,
                }),
                _ => Err(HttpSinkError::config(
                    AUTH_TYPE,
                    format!(
                        "{}, {}, and {} are required when auth.type is 'oauth2'",
                        AUTH_OAUTH2_TOKEN_URL, AUTH_OAUTH2_CLIENT_ID, AUTH_OAUTH2_CLIENT_SECRET
                    ),
                )),
            }
        }
        other => Err(HttpSinkError::config(
            AUTH_TYPE,
            format!(
                "must be one of none, basic, bearer, apikey, oauth2; got '{}'",
                other
            ),
        )),
    }
}
