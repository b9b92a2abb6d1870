//! Unified error handling for the client.
//!
//! Every fallible operation returns `Result<T, ClientError>`. Helpers never
//! swallow a failure into an empty value; callers decide how to surface it.

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (connection refused, DNS, TLS...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but did not carry the expected payload.
    #[error("Malformed response: missing {0}")]
    MissingField(String),

    /// Invalid request URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The operation needs a logged-in user.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Input rejected before sending anything.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Reading or writing the persisted session failed.
    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or transport failure.
    Transport,
    /// 4xx: validation, not found, forbidden, conflict, rate limit.
    Client,
    /// 5xx.
    Server,
    /// The body could not be decoded.
    Decode,
    /// Failure before any request was sent.
    Local,
}

impl ClientError {
    /// Build a status error from a response status and server message.
    #[must_use]
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(err) => err
                .status()
                .map_or(ErrorKind::Transport, classify_status),
            Self::Status { status, .. } => classify_status(*status),
            Self::RateLimited(_) => ErrorKind::Client,
            Self::Parse(_) | Self::MissingField(_) => ErrorKind::Decode,
            Self::Url(_)
            | Self::NotAuthenticated
            | Self::Validation(_)
            | Self::Storage(_)
            | Self::Config(_) => ErrorKind::Local,
        }
    }

    /// HTTP status of the failed response, if one was received.
    #[must_use]
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(StatusCode::TOO_MANY_REQUESTS),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Message suitable for showing to a user.
    ///
    /// Server-reported messages are passed through; everything else is
    /// summarized.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Http(_) => "Network error".to_string(),
            Self::RateLimited(secs) => format!("Too many requests, retry in {secs}s"),
            Self::Parse(_) | Self::MissingField(_) => "Unexpected server response".to_string(),
            Self::NotAuthenticated => "Please log in".to_string(),
            other => other.to_string(),
        }
    }
}

fn classify_status(status: StatusCode) -> ErrorKind {
    if status.is_server_error() {
        ErrorKind::Server
    } else {
        ErrorKind::Client
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
