// Error types for devpulse.
// Normalizes upstream GitHub failures, cache rejections, and local validation errors.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Every failure the pipeline can surface.
///
/// The enum is `Clone` so a single in-flight stats fetch can hand the same
/// outcome to every attached caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PulseError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication failed")]
    AuthFailed,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("GitHub API rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<String> },

    #[error("Validation failed")]
    UpstreamValidation,

    #[error("GitHub API is temporarily unavailable")]
    UpstreamUnavailable,

    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Network connectivity issue - cannot reach GitHub API: {0}")]
    NetworkUnavailable(String),

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Payload of {size} bytes exceeds cache item limit of {limit} bytes")]
    SerializationTooLarge { size: usize, limit: usize },

    #[error("{0}")]
    Unknown(String),
}

fn reset_suffix(reset_at: &Option<String>) -> String {
    match reset_at {
        Some(at) => format!(", resets at {}", at),
        None => String::new(),
    }
}

impl PulseError {
    /// HTTP status returned to proxy callers for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PulseError::Validation(_) => StatusCode::BAD_REQUEST,
            PulseError::AuthFailed => StatusCode::UNAUTHORIZED,
            PulseError::NotFound(_) => StatusCode::NOT_FOUND,
            PulseError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PulseError::UpstreamValidation => StatusCode::UNPROCESSABLE_ENTITY,
            PulseError::UpstreamUnavailable
            | PulseError::NetworkUnavailable(_)
            | PulseError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            PulseError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            PulseError::SerializationTooLarge { .. } | PulseError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PulseError::Validation(_)
                | PulseError::AuthFailed
                | PulseError::NotFound(_)
                | PulseError::UpstreamValidation
                | PulseError::SerializationTooLarge { .. }
        )
    }
}

impl From<reqwest::Error> for PulseError {
    /// Timeouts land here as network errors. Only [`crate::github::GitHubClient`]
    /// knows the deadline, and it reports those as [`PulseError::Timeout`] itself.
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_request() {
            PulseError::NetworkUnavailable(err.to_string())
        } else if err.is_decode() {
            PulseError::Unknown(format!("Failed to decode GitHub API response: {}", err))
        } else {
            PulseError::Unknown(format!("Failed to fetch from GitHub API: {}", err))
        }
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        PulseError::Unknown(format!("Unexpected payload shape: {}", err))
    }
}

impl From<std::io::Error> for PulseError {
    fn from(err: std::io::Error) -> Self {
        PulseError::Unknown(format!("IO error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
