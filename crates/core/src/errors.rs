//! Conversions from shared-primitive errors into the domain error.

use panelpost_common::{CommonError, DpopError};
use panelpost_domain::PanelPostError;

/// Map a [`CommonError`] raised by a shared primitive.
pub fn map_common(err: CommonError) -> PanelPostError {
    match err {
        CommonError::Validation { field, message } => {
            PanelPostError::InvalidInput(format!("{field}: {message}"))
        }
        CommonError::Serialization { message, format } => {
            PanelPostError::Internal(format!("{format} decoding failed: {message}"))
        }
        CommonError::Internal { message, context } => match context {
            Some(context) => PanelPostError::Internal(format!("{context}: {message}")),
            None => PanelPostError::Internal(message),
        },
    }
}

/// Map a DPoP key or proof failure.
pub fn map_dpop(err: DpopError) -> PanelPostError {
    match err {
        DpopError::KeyImport(message) => PanelPostError::KeyImport(message),
        DpopError::Encoding(message) => PanelPostError::Security(message),
    }
}
