//! Error types for the application

use thiserror::Error;

/// Result type alias using our ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// HTTP status codes worth retrying for remote writes
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Local file errors (listing snapshots)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication errors (expired session, bad API key, login redirect)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}, retry after {retry_after_seconds:?} seconds")]
    RateLimit {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    /// Non-success HTTP status not covered by a more specific variant
    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The offer was already accepted, declined or cancelled remotely
    #[error("Offer already resolved: {0}")]
    AlreadyResolved(String),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Build the error for a non-success HTTP status
    ///
    /// 401/403 become `Authentication`, 429 becomes `RateLimit`,
    /// everything else keeps the raw status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => ClientError::Authentication(format!("status {}", status)),
            429 => ClientError::RateLimit {
                message: body,
                retry_after_seconds: None,
            },
            _ => ClientError::Status { status, body },
        }
    }

    /// Whether a remote call failing with this error may succeed on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RateLimit { .. } | ClientError::Timeout(_) => true,
            ClientError::Status { status, .. } => RETRYABLE_STATUS_CODES.contains(status),
            ClientError::HttpRequest(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether this is a credentials problem that retrying cannot fix
    pub fn is_authentication(&self) -> bool {
        matches!(self, ClientError::Authentication(_))
    }
}
