//! Token freshness policy applied before scheduled or resumed posting.

use panelpost_common::auth::jwt_expiration_ms;
use panelpost_common::DpopKeyPair;
use panelpost_domain::constants::REFRESH_THRESHOLD_MS;
use panelpost_domain::{AppPasswordSession, OAuthConfig, OAuthSession, PanelPostError, Result};
use tracing::{debug, info, instrument};

use super::context::AuthContext;
use super::ports::TokenRefresher;

/// Whatever session state the caller currently holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessInput<'a> {
    pub session: Option<&'a OAuthSession>,
    pub key_pair: Option<&'a DpopKeyPair>,
    pub oauth_config: Option<&'a OAuthConfig>,
    pub app_password: Option<&'a AppPasswordSession>,
}

/// Outcome of [`ensure_fresh_auth_context`].
///
/// When `refreshed` is set, the replacement session is returned so the
/// caller can persist it; the old tokens must not be used again.
#[derive(Debug, Clone, Default)]
pub struct FreshAuth {
    pub context: Option<AuthContext>,
    pub refreshed: bool,
    pub session: Option<OAuthSession>,
    pub app_password: Option<AppPasswordSession>,
}

/// Return a usable [`AuthContext`], refreshing tokens that expire within the
/// look-ahead window.
///
/// Performs no side effects other than the refresh call itself.
#[instrument(skip_all)]
pub async fn ensure_fresh_auth_context(
    input: FreshnessInput<'_>,
    refresher: &dyn TokenRefresher,
    now_ms: i64,
) -> Result<FreshAuth> {
    if let (Some(session), Some(key_pair)) = (input.session, input.key_pair) {
        if !session.expires_within(now_ms, REFRESH_THRESHOLD_MS) {
            return Ok(FreshAuth {
                context: Some(AuthContext::OAuth {
                    session: session.clone(),
                    key_pair: key_pair.clone(),
                }),
                ..FreshAuth::default()
            });
        }
        let config = input.oauth_config.ok_or_else(|| {
            PanelPostError::Config("OAuth configuration is missing. Cannot refresh session.".into())
        })?;
        info!(expires_at = session.expires_at, "Refreshing OAuth session before use");
        let next = refresher.refresh_oauth(config, session, key_pair).await?;
        return Ok(FreshAuth {
            context: Some(AuthContext::OAuth { session: next.clone(), key_pair: key_pair.clone() }),
            refreshed: true,
            session: Some(next),
            app_password: None,
        });
    }

    if let Some(app_password) = input.app_password {
        let should_refresh = match jwt_expiration_ms(&app_password.access_jwt) {
            Some(expires_at) => expires_at <= now_ms + REFRESH_THRESHOLD_MS,
            None => app_password.refresh_jwt.is_some(),
        };
        if should_refresh && app_password.refresh_jwt.is_some() {
            info!(did = %app_password.did, "Refreshing password session before use");
            let next = refresher.refresh_password(app_password).await?;
            return Ok(FreshAuth {
                context: Some(AuthContext::from(&next)),
                refreshed: true,
                session: None,
                app_password: Some(next),
            });
        }
        return Ok(FreshAuth {
            context: Some(AuthContext::from(app_password)),
            ..FreshAuth::default()
        });
    }

    debug!("No session available");
    Ok(FreshAuth::default())
}
