//! Error types for the lookup pipeline.
//!
//! `LookupError` carries the detailed cause; `ErrorKind` is the coarse
//! taxonomy callers branch on.

use std::time::Duration;

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::store::StoreError;

/// Main error type for the lookup library.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Input missing, not a string, or outside the accepted length.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Credential absent or otherwise unusable at call time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Upstream rejected the credential (HTTP 401).
    #[error("upstream authentication failed: {0}")]
    Auth(String),

    /// Upstream rate limited the call (HTTP 429).
    #[error("upstream rate limited{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// Upstream kept failing with 5xx until the attempt budget ran out.
    #[error("upstream server error (status {status}) after {attempts} attempts")]
    Server { status: u16, attempts: u32 },

    /// Any other non-2xx status. Never retried.
    #[error("upstream request failed (status {status}): {message}")]
    Status { status: u16, message: String },

    /// Network failure on the final attempt.
    #[error("upstream request failed after {attempts} attempts: {source}")]
    Network {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The overall call budget elapsed.
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    /// Reply lacked a usable JSON payload, or it failed validation.
    #[error("could not parse result: {0}")]
    Parse(String),

    /// Building the HTTP client failed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The lookup succeeded but recording it did not.
    #[error("failed to record result: {0}")]
    Report(#[from] StoreError),
}

/// Failure taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    Auth,
    RateLimit,
    Server,
    Transport,
    Parse,
    Configuration,
    Storage,
}

/// What a caller should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Disposition {
    /// The input was bad; retrying the same input will not help.
    BadInput,
    /// Transient; the same call may succeed later.
    RetryLater,
    /// Credential or deployment problem.
    Misconfigured,
    /// The upstream broke its contract.
    Internal,
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Configuration(_) | Self::Client(_) => ErrorKind::Configuration,
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Server { .. } => ErrorKind::Server,
            Self::Status { .. } | Self::Network { .. } | Self::Timeout(_) => ErrorKind::Transport,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Report(_) => ErrorKind::Storage,
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            Self::InvalidArgument(_) => Disposition::BadInput,
            Self::Configuration(_) | Self::Client(_) | Self::Auth(_) => Disposition::Misconfigured,
            Self::RateLimited { .. }
            | Self::Server { .. }
            | Self::Network { .. }
            | Self::Timeout(_) => Disposition::RetryLater,
            Self::Status { .. } | Self::Parse(_) | Self::Report(_) => Disposition::Internal,
        }
    }

    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument(msg) => msg.clone(),
            Self::Configuration(_) | Self::Client(_) => "API key not configured.".to_string(),
            Self::Auth(_) => "API authentication failed.".to_string(),
            Self::RateLimited { .. } => "Rate limit exceeded. Try again later.".to_string(),
            Self::Server { .. } => "Server error. Try again later.".to_string(),
            Self::Status { status, .. } => format!("API request failed ({status})."),
            Self::Network { .. } | Self::Timeout(_) => {
                "Could not reach the nutrition service. Try again later.".to_string()
            }
            Self::Parse(_) => "Could not parse food data.".to_string(),
            Self::Report(_) => "Could not save the food log.".to_string(),
        }
    }
}

/// Result type alias for lookup operations.
pub type Result<T> = std::result::Result<T, LookupError>;
