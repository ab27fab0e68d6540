//! Conversions from external infrastructure errors into domain errors.

use image::ImageError;
use panelpost_domain::PanelPostError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PanelPostError);

impl From<InfraError> for PanelPostError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PanelPostError> for InfraError {
    fn from(value: PanelPostError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoPanelPostError {
    fn into_panelpost(self) -> PanelPostError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → PanelPostError */
/* -------------------------------------------------------------------------- */

impl IntoPanelPostError for HttpError {
    fn into_panelpost(self) -> PanelPostError {
        if self.is_timeout() {
            return PanelPostError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return PanelPostError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return PanelPostError::Internal(format!("malformed HTTP response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => PanelPostError::Auth(message),
                404 => PanelPostError::NotFound(message),
                400..=499 if code != 429 => PanelPostError::InvalidInput(message),
                _ => PanelPostError::Network(message),
            };
        }

        PanelPostError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_panelpost())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → PanelPostError */
/* -------------------------------------------------------------------------- */

impl IntoPanelPostError for std::io::Error {
    fn into_panelpost(self) -> PanelPostError {
        match self.kind() {
            std::io::ErrorKind::NotFound => PanelPostError::NotFound(self.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                PanelPostError::Storage(format!("permission denied: {self}"))
            }
            _ => PanelPostError::Storage(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_panelpost())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / toml → PanelPostError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(PanelPostError::Internal(format!("JSON serialization failed: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(PanelPostError::Config(format!("invalid TOML: {value}")))
    }
}

impl From<url::ParseError> for InfraError {
    fn from(value: url::ParseError) -> Self {
        InfraError(PanelPostError::InvalidInput(format!("invalid URL: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* image::ImageError → PanelPostError */
/* -------------------------------------------------------------------------- */

impl IntoPanelPostError for ImageError {
    fn into_panelpost(self) -> PanelPostError {
        match self {
            ImageError::Decoding(err) => {
                PanelPostError::InvalidInput(format!("image could not be decoded: {err}"))
            }
            ImageError::Unsupported(err) => {
                PanelPostError::InvalidInput(format!("unsupported image: {err}"))
            }
            ImageError::IoError(err) => err.into_panelpost(),
            other => PanelPostError::Internal(format!("image processing failed: {other}")),
        }
    }
}

impl From<ImageError> for InfraError {
    fn from(value: ImageError) -> Self {
        InfraError(value.into_panelpost())
    }
}

/// Map any of the supported sources straight to the domain error.
pub(crate) fn domain<E>(err: E) -> PanelPostError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
