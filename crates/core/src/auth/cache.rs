//! In-memory mirror of the current session.
//!
//! Owned by the application context and handed to whatever needs
//! synchronous access to the signed-in session. Single writer by
//! convention; readers may observe a value one operation stale.

use std::sync::Arc;

use panelpost_common::DpopKeyPair;
use panelpost_domain::{AppPasswordSession, OAuthSession};
use parking_lot::RwLock;

use super::context::AuthContext;

/// OAuth session together with the key its tokens are bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSession {
    pub session: OAuthSession,
    pub key_pair: DpopKeyPair,
}

#[derive(Debug, Default)]
struct CacheState {
    oauth: Option<CachedSession>,
    app_password: Option<AppPasswordSession>,
}

/// Cheaply cloneable handle to the shared session cache.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    state: Arc<RwLock<CacheState>>,
}

impl SessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Option<CachedSession> {
        self.state.read().oauth.clone()
    }

    pub fn set(&self, session: OAuthSession, key_pair: DpopKeyPair) {
        self.state.write().oauth = Some(CachedSession { session, key_pair });
    }

    #[must_use]
    pub fn app_password(&self) -> Option<AppPasswordSession> {
        self.state.read().app_password.clone()
    }

    pub fn set_app_password(&self, session: AppPasswordSession) {
        self.state.write().app_password = Some(session);
    }

    /// Context for the cached sessions, OAuth first.
    #[must_use]
    pub fn auth_context(&self) -> Option<AuthContext> {
        let state = self.state.read();
        AuthContext::from_sessions(
            state.oauth.as_ref().map(|cached| &cached.session),
            state.oauth.as_ref().map(|cached| &cached.key_pair),
            state.app_password.as_ref(),
        )
    }

    /// Forget every cached session.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.oauth = None;
        state.app_password = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> OAuthSession {
        OAuthSession {
            access_token: "a".into(),
            refresh_token: None,
            active_did: "did:plc:alice".into(),
            expires_at: 1,
            pds_url: "https://pds.example".into(),
        }
    }

    #[test]
    fn clones_share_state() {
        let cache = SessionCache::new();
        let handle = cache.clone();
        let key = DpopKeyPair::generate();
        cache.set(session(), key.clone());

        let cached = handle.get().unwrap();
        assert_eq!(cached.session, session());
        assert_eq!(cached.key_pair, key);
        assert!(matches!(handle.auth_context(), Some(AuthContext::OAuth { .. })));
    }

    #[test]
    fn clear_drops_both_schemes() {
        let cache = SessionCache::new();
        cache.set(session(), DpopKeyPair::generate());
        cache.set_app_password(AppPasswordSession {
            service: "https://bsky.social".into(),
            did: "did:plc:bob".into(),
            handle: "bob".into(),
            access_jwt: "jwt".into(),
            refresh_jwt: None,
        });

        cache.clear();
        assert!(cache.get().is_none());
        assert!(cache.app_password().is_none());
        assert!(cache.auth_context().is_none());
    }
}
