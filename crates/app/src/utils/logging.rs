//! Tracing setup and command outcome logging.

use std::time::Duration;

use anyhow::Context;
use panelpost_domain::{LoggingConfig, PanelPostError};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "panelpost=info";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.filter`. Output is JSON when
/// `logging.json` is set, human-readable otherwise.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter.as_deref().unwrap_or(DEFAULT_FILTER))
            .context("invalid log filter")?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry.with(fmt::layer().json().with_current_span(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    }
    .context("tracing subscriber already installed")
}

/// Log the outcome of a command execution with structured fields.
///
/// `command` should be a stable identifier without sensitive data.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&PanelPostError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(err) => {
            warn!(command, duration_ms, error_type = error_label(err), "command_execution_failure");
        }
    }
}

/// Convert a `PanelPostError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &PanelPostError) -> &'static str {
    match error {
        PanelPostError::Config(_) => "config",
        PanelPostError::Network(_) => "network",
        PanelPostError::Auth(_) => "auth",
        PanelPostError::Security(_) => "security",
        PanelPostError::Storage(_) => "storage",
        PanelPostError::NotFound(_) => "not_found",
        PanelPostError::InvalidInput(_) => "invalid_input",
        PanelPostError::Internal(_) => "internal",
        PanelPostError::TokenExchange { .. } => "token_exchange",
        PanelPostError::TokenRefresh { .. } => "token_refresh",
        PanelPostError::Login { .. } => "login",
        PanelPostError::MissingRefreshToken => "missing_refresh_token",
        PanelPostError::StateMismatch => "state_mismatch",
        PanelPostError::AuthorizationDenied(_) => "authorization_denied",
        PanelPostError::MissingPendingAuthorization => "missing_pending_authorization",
        PanelPostError::KeyImport(_) => "key_import",
        PanelPostError::Api { .. } => "api",
        PanelPostError::EmptyPlan => "empty_plan",
        PanelPostError::MissingBlob(_) => "missing_blob",
        PanelPostError::Cancelled => "cancelled",
    }
}
