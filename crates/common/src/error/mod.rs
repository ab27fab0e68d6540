//! Shared error type for the primitives in this crate.
//!
//! Module-specific errors (for example [`crate::auth::DpopError`]) stay
//! close to their module. Higher layers map `CommonError` into the domain
//! error at their boundary.

use thiserror::Error;

pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommonError {
    #[error("{format} decoding failed: {message}")]
    Serialization { format: &'static str, message: String },

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{}{message}", .context.as_deref().map(|c| format!("{c}: ")).unwrap_or_default())]
    Internal { message: String, context: Option<String> },
}

impl CommonError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), context: None }
    }

    pub fn internal_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { format: "JSON", message: err.to_string() }
    }
}

impl From<base64::DecodeError> for CommonError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Serialization { format: "base64", message: err.to_string() }
    }
}
