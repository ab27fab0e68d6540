//! OAuth authorization-code flow with PKCE and DPoP-bound tokens.

use panelpost_common::{DpopKeyPair, PKCEChallenge, ProofOptions};
use panelpost_core::errors::map_dpop;
use panelpost_domain::constants::DEFAULT_TOKEN_LIFETIME_SECS;
use panelpost_domain::{OAuthConfig, OAuthSession, PanelPostError, Result};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

use super::now_ms;
use crate::errors::{domain, InfraError};
use crate::http::client::status_and_body;
use crate::http::HttpClient;

const AUTHORIZE_PATH: &str = "/oauth/authorize";
const TOKEN_PATH: &str = "/oauth/token";

/// Everything needed to send the user to the authorization server and to
/// finish the attempt afterwards.
#[derive(Debug, Clone)]
pub struct AuthorizationPreparation {
    pub authorize_url: String,
    pub code_verifier: String,
    pub state: String,
    pub key_pair: DpopKeyPair,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(alias = "sub")]
    active: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_session(self, pds_url: &str, previous_refresh: Option<&str>) -> OAuthSession {
        let lifetime = self.expires_in.filter(|secs| *secs > 0).unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        OAuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or_else(|| previous_refresh.map(str::to_string)),
            active_did: self.active,
            expires_at: now_ms() + lifetime * 1000,
            pds_url: pds_url.to_string(),
        }
    }
}

/// Client for the authorization server's OAuth endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: HttpClient,
}

impl OAuthClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Generate verifier, state and key pair for one attempt and build the
    /// authorization URL. Nothing is sent.
    pub fn prepare_authorization(&self, config: &OAuthConfig) -> Result<AuthorizationPreparation> {
        config.validate()?;
        let pkce = PKCEChallenge::generate();
        let key_pair = DpopKeyPair::generate();

        let mut url = endpoint(&config.pds_url, AUTHORIZE_PATH)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("scope", &config.scope)
            .append_pair("code_challenge", &pkce.code_challenge)
            .append_pair("code_challenge_method", pkce.challenge_method())
            .append_pair("state", &pkce.state)
            .append_pair("nonce", &Uuid::new_v4().to_string());

        debug!(pds = %config.pds_url, "prepared authorization request");
        Ok(AuthorizationPreparation {
            authorize_url: url.into(),
            code_verifier: pkce.code_verifier,
            state: pkce.state,
            key_pair,
        })
    }

    /// Trade an authorization code for a session bound to `key_pair`.
    #[instrument(skip(self, code, code_verifier, key_pair), fields(pds = %config.pds_url))]
    pub async fn exchange_code(
        &self,
        config: &OAuthConfig,
        code: &str,
        code_verifier: &str,
        key_pair: &DpopKeyPair,
    ) -> Result<OAuthSession> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];
        let token = self
            .token_request(config, &form, key_pair, |status, body| PanelPostError::TokenExchange {
                status,
                body,
            })
            .await?;

        let session = token.into_session(&config.pds_url, None);
        info!(did = %session.active_did, "authorization code exchanged");
        Ok(session)
    }

    /// Refresh `session`, keeping its refresh token when the server does not
    /// rotate it.
    #[instrument(skip_all, fields(pds = %config.pds_url))]
    pub async fn refresh(
        &self,
        config: &OAuthConfig,
        session: &OAuthSession,
        key_pair: &DpopKeyPair,
    ) -> Result<OAuthSession> {
        let refresh_token =
            session.refresh_token.as_deref().ok_or(PanelPostError::MissingRefreshToken)?;
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        let token = self
            .token_request(config, &form, key_pair, |status, body| PanelPostError::TokenRefresh {
                status,
                body,
            })
            .await?;

        debug!("access token refreshed");
        Ok(token.into_session(&config.pds_url, Some(refresh_token)))
    }

    async fn token_request(
        &self,
        config: &OAuthConfig,
        form: &[(&str, &str)],
        key_pair: &DpopKeyPair,
        on_failure: impl FnOnce(u16, String) -> PanelPostError,
    ) -> Result<TokenResponse> {
        let url = endpoint(&config.pds_url, TOKEN_PATH)?;
        let proof = key_pair
            .create_proof(ProofOptions {
                method: "POST",
                target_uri: url.as_str(),
                access_token_hash: None,
            })
            .map_err(map_dpop)?;

        let request = self.http.request(Method::POST, url).header("DPoP", proof).form(form);
        let response = self.http.send(request).await?;
        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(on_failure(status, body));
        }
        response.json::<TokenResponse>().await.map_err(domain)
    }
}

/// Resolve an absolute path against the server's origin.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url> {
    let base = Url::parse(base).map_err(InfraError::from)?;
    Ok(base.join(path).map_err(InfraError::from)?)
}
