//! Identifier + app password sessions.

use panelpost_domain::constants::{XRPC_CREATE_SESSION, XRPC_REFRESH_SESSION};
use panelpost_domain::{AppPasswordSession, PanelPostError, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::oauth::endpoint;
use crate::errors::domain;
use crate::http::client::status_and_body;
use crate::http::HttpClient;

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    access_jwt: String,
    #[serde(default)]
    refresh_jwt: Option<String>,
    did: String,
    handle: String,
}

impl SessionResponse {
    fn into_session(self, service: &str) -> AppPasswordSession {
        AppPasswordSession {
            service: service.to_string(),
            did: self.did,
            handle: self.handle,
            access_jwt: self.access_jwt,
            refresh_jwt: self.refresh_jwt,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PasswordAuthClient {
    http: HttpClient,
}

impl PasswordAuthClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Create a session on `service`.
    #[instrument(skip(self, password), fields(service = %service))]
    pub async fn login(
        &self,
        service: &str,
        identifier: &str,
        password: &str,
    ) -> Result<AppPasswordSession> {
        let url = endpoint(service, &format!("/xrpc/{XRPC_CREATE_SESSION}"))?;
        let request = self
            .http
            .request(Method::POST, url)
            .json(&CreateSessionRequest { identifier, password });

        let response = self.http.send(request).await?;
        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(PanelPostError::Login { status, body });
        }

        let session = parse(response).await?.into_session(service);
        info!(did = %session.did, handle = %session.handle, "password session created");
        Ok(session)
    }

    /// Trade the refresh JWT for a new session on the same service.
    #[instrument(skip_all, fields(service = %session.service))]
    pub async fn refresh(&self, session: &AppPasswordSession) -> Result<AppPasswordSession> {
        let refresh_jwt =
            session.refresh_jwt.as_deref().ok_or(PanelPostError::MissingRefreshToken)?;
        let url = endpoint(&session.service, &format!("/xrpc/{XRPC_REFRESH_SESSION}"))?;
        let request = self.http.request(Method::POST, url).bearer_auth(refresh_jwt);

        let response = self.http.send(request).await?;
        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(PanelPostError::TokenRefresh { status, body });
        }

        Ok(parse(response).await?.into_session(&session.service))
    }
}

async fn parse(response: reqwest::Response) -> Result<SessionResponse> {
    response.json().await.map_err(domain)
}
