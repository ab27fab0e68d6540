//! Port interfaces for token refresh
//!
//! The freshness policy decides *when* to refresh; adapters implementing
//! these traits decide *how* (HTTP calls to the token endpoint or the
//! password session endpoint).

use async_trait::async_trait;
use panelpost_common::DpopKeyPair;
use panelpost_domain::{AppPasswordSession, OAuthConfig, OAuthSession, Result};

/// Exchanges refresh credentials for new sessions.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Refresh an OAuth session with a DPoP-bound token request.
    async fn refresh_oauth(
        &self,
        config: &OAuthConfig,
        session: &OAuthSession,
        key_pair: &DpopKeyPair,
    ) -> Result<OAuthSession>;

    /// Refresh a password session using its refresh JWT.
    async fn refresh_password(&self, session: &AppPasswordSession) -> Result<AppPasswordSession>;
}
