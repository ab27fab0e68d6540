//! Signing in and out.

use panelpost_domain::{AppPasswordSession, PanelPostError, Result};
use panelpost_infra::auth::{handle_callback, CallbackParams};
use tracing::{info, instrument};

use crate::AppContext;

/// Sign in with an identifier and app password on the configured service.
#[instrument(skip(context, password))]
pub async fn login(
    context: &AppContext,
    identifier: &str,
    password: &str,
) -> Result<AppPasswordSession> {
    let session =
        context.password.login(&context.config.password.service, identifier, password).await?;
    context.sessions.persist_app_password(&session).await?;
    Ok(session)
}

/// Start an OAuth sign-in and return the URL to open.
///
/// The attempt is stored until [`complete_authorization`] consumes it.
#[instrument(skip(context))]
pub async fn authorize(context: &AppContext) -> Result<String> {
    let config = context
        .config
        .oauth
        .as_ref()
        .ok_or_else(|| PanelPostError::Config("OAuth is not configured".into()))?;

    let prepared = context.oauth.prepare_authorization(config)?;
    context.pending.store(&prepared, config).await?;
    Ok(prepared.authorize_url)
}

/// Finish the pending sign-in from the redirect URL.
///
/// Returns the signed-in DID, or `None` when the URL is not a callback.
#[instrument(skip_all)]
pub async fn complete_authorization(context: &AppContext, redirect_url: &str) -> Result<Option<String>> {
    let params = CallbackParams::from_url(redirect_url)?;
    let Some(outcome) = handle_callback(&params, &context.pending, &context.oauth).await? else {
        return Ok(None);
    };

    context.sessions.persist(&outcome.session, &outcome.key_pair).await?;
    info!(did = %outcome.session.active_did, "Signed in with OAuth");
    Ok(Some(outcome.session.active_did))
}

/// Forget every session, the pending attempt and the cache.
#[instrument(skip_all)]
pub async fn sign_out(context: &AppContext) -> Result<()> {
    context.sessions.clear().await?;
    context.sessions.clear_app_password().await?;
    context.pending.clear().await?;
    context.session_cache().clear();
    info!("Signed out");
    Ok(())
}

/// Who is signed in, OAuth first.
pub fn account_summary(context: &AppContext) -> Option<String> {
    let cache = context.session_cache();
    if let Some(cached) = cache.get() {
        return Some(format!("{} via OAuth on {}", cached.session.active_did, cached.session.pds_url));
    }
    cache
        .app_password()
        .map(|session| format!("@{} ({}) on {}", session.handle, session.did, session.service))
}
