use serde::Deserialize;
use thiserror::Error;

/// Typed error taxonomy for the LearnHub API.
///
/// `Auth` is the only kind `SessionClient` recovers from locally (one
/// refresh-and-retry); everything else propagates to the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authorization rejected - session expired or invalid")]
    Auth,

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        /// Field-level detail passed through from the error envelope.
        details: Option<serde_json::Value>,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unexpected response: {0}")]
    Unknown(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failure envelope: `{ success: false, error: { code, message, details? } }`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: Option<String>,
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Pull a human-readable message (and details) out of the failure
    /// envelope, falling back to the truncated raw body.
    fn parse_body(body: &str) -> (String, Option<serde_json::Value>) {
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
            if let Some(err) = envelope.error {
                let message = err
                    .message
                    .or(err.code)
                    .unwrap_or_else(|| Self::truncate_body(body));
                return (message, err.details);
            }
            if let Some(message) = envelope.message {
                return (message, None);
            }
        }
        (Self::truncate_body(body), None)
    }

    /// Map an HTTP status and response body to a typed error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let (message, details) = Self::parse_body(body);
        match status {
            401 => ApiError::Auth,
            400 | 422 => ApiError::Validation { message, details },
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server(message),
            _ => ApiError::Unknown(format!("Status {}: {}", status, message)),
        }
    }

    /// True for the 401-equivalent kind that triggers a refresh.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth)
    }
}
