//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for PanelPost
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PanelPostError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Token endpoint rejected an authorization-code exchange.
    #[error("Token exchange failed: {status} {body}")]
    TokenExchange { status: u16, body: String },

    /// Token endpoint (OAuth) or refreshSession (password) rejected a refresh.
    #[error("Refresh failed: {status} {body}")]
    TokenRefresh { status: u16, body: String },

    #[error("Login failed: {status} {body}")]
    Login { status: u16, body: String },

    #[error("No refresh token available")]
    MissingRefreshToken,

    /// Callback `state` differs from the pending attempt (possible CSRF).
    #[error("State mismatch in OAuth response")]
    StateMismatch,

    /// The authorization server redirected back with an `error` parameter.
    #[error("OAuth error: {0}")]
    AuthorizationDenied(String),

    #[error("Missing pending authorization context")]
    MissingPendingAuthorization,

    #[error("Failed to import DPoP key: {0}")]
    KeyImport(String),

    /// Non-2xx response from an XRPC endpoint.
    #[error("{endpoint} failed: {status} {body}")]
    Api { endpoint: String, status: u16, body: String },

    #[error("Thread creation did not produce a root post")]
    EmptyPlan,

    #[error("Missing uploaded blob for image {0}")]
    MissingBlob(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl PanelPostError {
    /// Whether the failure is transient and worth another attempt.
    ///
    /// Only 5xx/429 API responses and transport failures qualify; everything
    /// else (4xx, protocol and consistency errors) is terminal.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Network(_) => true,
            _ => false,
        }
    }

    /// Build an API error from an endpoint and response.
    pub fn api(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Api { endpoint: endpoint.into(), status, body: body.into() }
    }
}

/// Result type alias for PanelPost operations
pub type Result<T> = std::result::Result<T, PanelPostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_rate_limits_are_retryable() {
        assert!(PanelPostError::api("uploadBlob", 500, "").is_retryable());
        assert!(PanelPostError::api("uploadBlob", 503, "").is_retryable());
        assert!(PanelPostError::api("uploadBlob", 429, "").is_retryable());
        assert!(PanelPostError::Network("connection reset".into()).is_retryable());
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(!PanelPostError::api("createRecord", 400, "bad").is_retryable());
        assert!(!PanelPostError::api("createRecord", 401, "").is_retryable());
        assert!(!PanelPostError::StateMismatch.is_retryable());
        assert!(!PanelPostError::EmptyPlan.is_retryable());
    }

    #[test]
    fn api_error_message_carries_status_and_body() {
        let err = PanelPostError::api("Upload", 413, "too large");
        assert_eq!(err.to_string(), "Upload failed: 413 too large");
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(PanelPostError::Auth("expired".into())).unwrap();
        assert_eq!(json["type"], "Auth");
        assert_eq!(json["message"], "expired");
    }
}
