//! Error types for membership resolution.

use thiserror::Error;

/// Result type alias using `MembershipError`.
pub type MembershipResult<T> = Result<T, MembershipError>;

/// Errors that can occur while resolving group membership.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication or session precondition failure.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The supplied group identifier is not a valid object ID.
    #[error("Invalid group identifier: {0}")]
    InvalidGroupId(String),

    /// The requested traversal depth is outside the supported range.
    #[error("Invalid max depth {depth}, must be between 1 and 50")]
    InvalidDepth { depth: u32 },

    /// No group matched the given display name.
    #[error("No group found with display name '{0}'")]
    GroupNotFound(String),

    /// Microsoft Graph API error.
    #[error("Graph API error ({status}): {code} - {message}")]
    GraphApi {
        status: u16,
        code: String,
        message: String,
    },

    /// Request was throttled (HTTP 429).
    #[error("Rate limited by Graph API")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Permission denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Malformed directory response.
    #[error("Malformed directory response: {0}")]
    Decode(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MembershipError {
    /// Returns true for failures worth retrying: throttling and
    /// server-side faults. Everything else (not-found, forbidden,
    /// malformed input) is permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::GraphApi { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-requested minimum wait before retrying, when the failure
    /// carried a `Retry-After` header.
    #[must_use]
    pub fn retry_after_hint(&self) -> Option<std::time::Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(std::time::Duration::from_secs(*secs)),
            _ => None,
        }
    }
}
