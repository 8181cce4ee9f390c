//! Error types for the client library.

use serde::Deserialize;
use thiserror::Error;

/// Error body returned by the backend.
///
/// The backend answers failed requests with a small JSON envelope; only the
/// message is shown to users, the rest is logged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Human-readable error message.
    pub message: String,
    /// HTTP status echoed in the body, when present.
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Short error class name, when present.
    #[serde(default)]
    pub error: Option<String>,
}

/// Errors that can occur when talking to the gym-management backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Network or HTTP request failure.
    ///
    /// Covers DNS, connection, socket, and per-request timeout errors.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Middleware layer error.
    ///
    /// Errors raised inside the authentication middleware stack.
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failure (HTTP 401).
    ///
    /// Invalid credentials, or a request whose token could not be
    /// recovered by the one-shot refresh.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Client-side validation reject.
    ///
    /// The request never reached the network; fix the input and resubmit.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Any other non-success response from the backend.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body, or the raw body text.
        message: String,
    },

    /// Session storage failure (reading or writing the session file).
    #[error("Session storage error: {0}")]
    Storage(String),

    /// Client configuration issue, such as an unparsable base URL.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    /// Check if this error means the caller should re-authenticate.
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Check if this error came from the transport rather than the backend.
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Middleware(_))
    }

    /// Check if this error was raised before the request was sent.
    pub const fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias using [`ApiError`].
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_error_body_parses_backend_envelope() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"message": "Client not found", "statusCode": 404, "error": "Not Found"}"#,
        )
        .unwrap();
        assert_eq!(body.message, "Client not found");
        assert_eq!(body.status_code, Some(404));
        assert_eq!(body.error.as_deref(), Some("Not Found"));
    }

    #[test]
    fn test_error_body_tolerates_message_only() {
        let body: ErrorBody = serde_json::from_str(r#"{"message": "nope"}"#).unwrap();
        assert_eq!(body.message, "nope");
        assert!(body.status_code.is_none());
    }

    #[test]
    fn test_classification_helpers() {
        assert!(ApiError::Authentication("bad".into()).is_authentication_error());
        assert!(ApiError::Validation("empty".into()).is_validation_error());
        assert!(!ApiError::Api { status: 500, message: "boom".into() }.is_authentication_error());
    }
}
