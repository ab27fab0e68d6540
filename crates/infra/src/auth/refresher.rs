use async_trait::async_trait;
use panelpost_common::DpopKeyPair;
use panelpost_core::TokenRefresher;
use panelpost_domain::{AppPasswordSession, OAuthConfig, OAuthSession, Result};

use super::oauth::OAuthClient;
use super::password::PasswordAuthClient;

/// [`TokenRefresher`] backed by the live OAuth and password endpoints.
#[derive(Debug, Clone)]
pub struct AtProtoRefresher {
    oauth: OAuthClient,
    password: PasswordAuthClient,
}

impl AtProtoRefresher {
    pub fn new(oauth: OAuthClient, password: PasswordAuthClient) -> Self {
        Self { oauth, password }
    }
}

#[async_trait]
impl TokenRefresher for AtProtoRefresher {
    async fn refresh_oauth(
        &self,
        config: &OAuthConfig,
        session: &OAuthSession,
        key_pair: &DpopKeyPair,
    ) -> Result<OAuthSession> {
        self.oauth.refresh(config, session, key_pair).await
    }

    async fn refresh_password(&self, session: &AppPasswordSession) -> Result<AppPasswordSession> {
        self.password.refresh(session).await
    }
}
