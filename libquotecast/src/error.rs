//! Error types for Quotecast

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QuotecastError>;

/// Errors that abort a run.
///
/// Everything that is an expected outcome of a run (empty store, quote too
/// long, quota reached, publish failure) is reported through
/// [`crate::RunOutcome`] instead.
#[derive(Error, Debug)]
pub enum QuotecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Missing credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),
}

impl QuotecastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            QuotecastError::MissingCredentials(_) => 2,
            QuotecastError::Config(_) => 1,
            QuotecastError::Storage(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid SQL identifier for {field}: '{value}'")]
    InvalidIdentifier { field: String, value: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Quota file {path} is corrupt: {reason} (repair it as '<count>,<YYYY-MM-DD>' or delete it)")]
    CorruptQuota { path: String, reason: String },
}

/// Failures reported by a posting API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Rate limit exceeded (reset at {})", fmt_reset(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn fmt_reset(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(t) => t.to_rfc3339(),
        None => "unknown".to_string(),
    }
}

fn fmt_wait(wait: &Duration) -> String {
    humantime::format_duration(*wait).to_string()
}

/// Why a publish attempt ended without a post.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PublishError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Still rate limited after {0} retries")]
    RateLimitRetriesExhausted(u32),

    #[error("Rate limit reset is {} away, longer than the configured maximum wait", fmt_wait(.0))]
    RateLimitWaitTooLong(Duration),

    #[error("Cancelled while waiting for rate limit reset")]
    Cancelled,
}
