//! Error types for the HTTP sink connector
//!
//! This module defines the main error type used throughout the connector and
//! the structured configuration error domain. The variants mirror the fault
//! taxonomy of the per-record pipeline: configuration faults abort task
//! start-up, conversion/null/auth faults are never retried, transport faults
//! carry their own retryability, and publish faults are logged but never
//! propagated past the publishers.

use thiserror::Error;

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, HttpSinkError>;

/// Structured configuration error domain
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("{setting}: {reason}")]
    InvalidSetting { setting: String, reason: String },
    #[error("missing {0}")]
    Missing(String),
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    pub fn invalid_setting(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(setting: impl Into<String>) -> Self {
        Self::Missing(setting.into())
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for ConfigError {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

/// Main error type for the HTTP sink connector
#[derive(Error, Debug)]
pub enum HttpSinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Null record value: topic={topic}, partition={partition}, offset={offset}")]
    NullValue {
        topic: String,
        partition: i32,
        offset: i64,
    },

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {message}")]
    Transport { message: String, retryable: bool },

    #[error("HTTP request failed with status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task error: {0}")]
    Task(String),
}

impl HttpSinkError {
    /// Create a configuration error with setting context
    pub fn config(setting: &str, reason: impl Into<String>) -> Self {
        HttpSinkError::Config(ConfigError::invalid_setting(setting, reason))
    }

    /// Create a configuration error for a missing required setting
    pub fn config_missing(setting: &str) -> Self {
        HttpSinkError::Config(ConfigError::missing(setting))
    }

    /// Create a conversion error
    pub fn conversion(detail: impl Into<String>) -> Self {
        HttpSinkError::Conversion(detail.into())
    }

    /// Create an authentication error
    pub fn auth(detail: impl Into<String>) -> Self {
        HttpSinkError::Auth(detail.into())
    }

    /// Create a transport error with explicit retryability
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        HttpSinkError::Transport {
            message: message.into(),
            retryable,
        }
    }

    /// Create a publish error
    pub fn publish(detail: impl Into<String>) -> Self {
        HttpSinkError::Publish(detail.into())
    }

    /// Returns true if the retry loop may attempt this failure again.
    ///
    /// Only transport faults marked retryable (connect, read/write, timeout)
    /// qualify. Authentication and conversion faults are terminal by
    /// definition; HTTP status retryability is decided separately against the
    /// configured status-code set.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HttpSinkError::Transport { retryable: true, .. })
    }
}
