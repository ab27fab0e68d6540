//! Finishing an authorization from the redirect back to the client.

use panelpost_common::auth::validate_state;
use panelpost_common::DpopKeyPair;
use panelpost_domain::{OAuthConfig, OAuthSession, PanelPostError, Result};
use tracing::{info, instrument, warn};
use url::Url;

use super::oauth::OAuthClient;
use super::pending::PendingAuthorizationStore;
use crate::errors::InfraError;

/// Query parameters the authorization server redirects back with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Read the parameters from a full redirect URL.
    pub fn from_url(redirect: &str) -> Result<Self> {
        let url = Url::parse(redirect).map_err(InfraError::from)?;
        let mut params = Self::default();
        for (name, value) in url.query_pairs() {
            let slot = match name.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        Ok(params)
    }
}

/// A completed authorization.
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub session: OAuthSession,
    pub config: OAuthConfig,
    pub key_pair: DpopKeyPair,
}

/// Complete the pending attempt.
///
/// Returns `Ok(None)` when the parameters carry no code/state pair, which
/// means this is not a callback at all. The pending attempt is cleared only
/// after a successful exchange.
#[instrument(skip_all)]
pub async fn handle_callback(
    params: &CallbackParams,
    pending: &PendingAuthorizationStore,
    client: &OAuthClient,
) -> Result<Option<CallbackOutcome>> {
    if let Some(error) = &params.error {
        let message = match &params.error_description {
            Some(description) => format!("{error} - {description}"),
            None => error.clone(),
        };
        return Err(PanelPostError::AuthorizationDenied(message));
    }

    let (Some(code), Some(state)) = (&params.code, &params.state) else {
        return Ok(None);
    };

    let attempt = pending.restore().await?.ok_or(PanelPostError::MissingPendingAuthorization)?;
    if !validate_state(&attempt.state, state) {
        warn!("callback state does not match the pending attempt");
        return Err(PanelPostError::StateMismatch);
    }

    let session =
        client.exchange_code(&attempt.config, code, &attempt.code_verifier, &attempt.key_pair).await?;
    pending.clear().await?;

    info!(did = %session.active_did, "authorization completed");
    Ok(Some(CallbackOutcome { session, config: attempt.config, key_pair: attempt.key_pair }))
}
