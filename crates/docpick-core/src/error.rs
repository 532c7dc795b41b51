//! Error types for docpick.

use thiserror::Error;

/// Result type alias using docpick's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for docpick operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP/network request failed before a response arrived
    #[error("Request error: {0}")]
    Request(String),

    /// A source did not answer within its time budget
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Resource not found (HTTP 404 or unknown id)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success HTTP status other than 404
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A payload arrived but did not match the expected schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Confirmation attempted with nothing selected
    #[error("Nothing selected")]
    EmptySelection,

    /// The picker session was already confirmed or cancelled
    #[error("Session closed")]
    SessionClosed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is a transient network failure.
    ///
    /// 404 is deliberately excluded: an absent uploads index means zero
    /// results, not a degraded source.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Request(_) | Error::Timeout(_) => true,
            Error::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether this error is a 404 / unknown resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Error::Request(format!("timed out: {}", e));
        }
        Error::Request(e.to_string())
    }
}
