//! The two ways a request can be authenticated.

use panelpost_common::auth::hash_access_token;
use panelpost_common::{DpopKeyPair, ProofOptions};
use panelpost_domain::{AppPasswordSession, OAuthSession, Result};

use crate::errors::map_dpop;

/// Headers to attach to exactly one request.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    /// `Authorization` value (`DPoP <token>` or `Bearer <jwt>`).
    pub authorization: String,
    /// `DPoP` proof, present for OAuth requests only.
    pub dpop: Option<String>,
}

impl AuthHeaders {
    /// Header name/value pairs in the order they should be sent.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        std::iter::once(("Authorization", self.authorization.as_str()))
            .chain(self.dpop.as_deref().map(|proof| ("DPoP", proof)))
    }
}

impl std::fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("authorization", &"[REDACTED]")
            .field("dpop", &self.dpop.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Build the `DPoP` authorization header and a proof bound to `endpoint`,
/// `method` and the hash of `access_token`.
///
/// A new proof is minted on every call; results must not be reused across
/// requests.
pub fn build_dpop_auth_header(
    access_token: &str,
    endpoint: &str,
    method: &str,
    key_pair: &DpopKeyPair,
) -> Result<AuthHeaders> {
    let ath = hash_access_token(access_token);
    let proof = key_pair
        .create_proof(ProofOptions {
            method,
            target_uri: endpoint,
            access_token_hash: Some(&ath),
        })
        .map_err(map_dpop)?;
    Ok(AuthHeaders { authorization: format!("DPoP {access_token}"), dpop: Some(proof) })
}

/// Credentials for authenticated XRPC calls.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    OAuth { session: OAuthSession, key_pair: DpopKeyPair },
    AppPassword { service: String, did: String, access_jwt: String, refresh_jwt: Option<String> },
}

impl AuthContext {
    /// Pick the usable context from whatever sessions are present.
    ///
    /// An OAuth session only counts together with its key pair; otherwise
    /// the password session is used.
    #[must_use]
    pub fn from_sessions(
        session: Option<&OAuthSession>,
        key_pair: Option<&DpopKeyPair>,
        app_password: Option<&AppPasswordSession>,
    ) -> Option<Self> {
        match (session, key_pair, app_password) {
            (Some(session), Some(key_pair), _) => {
                Some(Self::OAuth { session: session.clone(), key_pair: key_pair.clone() })
            }
            (_, _, Some(app_password)) => Some(Self::from(app_password)),
            _ => None,
        }
    }

    /// Resource server the XRPC calls go to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match self {
            Self::OAuth { session, .. } => &session.pds_url,
            Self::AppPassword { service, .. } => service,
        }
    }

    /// Repository (account DID) that records are written to.
    #[must_use]
    pub fn repo_did(&self) -> &str {
        match self {
            Self::OAuth { session, .. } => &session.active_did,
            Self::AppPassword { did, .. } => did,
        }
    }

    /// Headers for one request to `endpoint`.
    ///
    /// Call once per attempt: OAuth proofs are single-use.
    pub fn build_headers(&self, endpoint: &str, method: &str) -> Result<AuthHeaders> {
        match self {
            Self::OAuth { session, key_pair } => {
                build_dpop_auth_header(&session.access_token, endpoint, method, key_pair)
            }
            Self::AppPassword { access_jwt, .. } => {
                Ok(AuthHeaders { authorization: format!("Bearer {access_jwt}"), dpop: None })
            }
        }
    }
}

impl From<&AppPasswordSession> for AuthContext {
    fn from(session: &AppPasswordSession) -> Self {
        Self::AppPassword {
            service: session.service.clone(),
            did: session.did.clone(),
            access_jwt: session.access_jwt.clone(),
            refresh_jwt: session.refresh_jwt.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    use super::*;

    fn oauth_session() -> OAuthSession {
        OAuthSession {
            access_token: "access-123".into(),
            refresh_token: Some("refresh-123".into()),
            active_did: "did:plc:alice".into(),
            expires_at: 0,
            pds_url: "https://pds.example".into(),
        }
    }

    fn password_session() -> AppPasswordSession {
        AppPasswordSession {
            service: "https://bsky.social".into(),
            did: "did:plc:bob".into(),
            handle: "bob.bsky.social".into(),
            access_jwt: "jwt-abc".into(),
            refresh_jwt: None,
        }
    }

    fn claims(proof: &str) -> serde_json::Value {
        let payload = proof.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn oauth_headers_use_dpop_scheme_and_bind_the_token() {
        let context = AuthContext::OAuth { session: oauth_session(), key_pair: DpopKeyPair::generate() };
        let endpoint = "https://pds.example/xrpc/com.atproto.repo.createRecord";
        let headers = context.build_headers(endpoint, "POST").unwrap();

        assert_eq!(headers.authorization, "DPoP access-123");
        let proof = claims(headers.dpop.as_deref().unwrap());
        assert_eq!(proof["htm"], "POST");
        assert_eq!(proof["htu"], endpoint);
        assert_eq!(proof["ath"], hash_access_token("access-123"));
    }

    #[test]
    fn each_call_mints_a_new_proof() {
        let context = AuthContext::OAuth { session: oauth_session(), key_pair: DpopKeyPair::generate() };
        let first = context.build_headers("https://pds.example/xrpc/x", "POST").unwrap();
        let second = context.build_headers("https://pds.example/xrpc/x", "POST").unwrap();
        assert_ne!(first.dpop, second.dpop);
    }

    #[test]
    fn password_headers_are_plain_bearer() {
        let context = AuthContext::from(&password_session());
        let headers = context.build_headers("https://bsky.social/xrpc/x", "POST").unwrap();
        assert_eq!(headers.authorization, "Bearer jwt-abc");
        assert!(headers.dpop.is_none());
        assert_eq!(headers.pairs().count(), 1);
        assert_eq!(context.base_url(), "https://bsky.social");
        assert_eq!(context.repo_did(), "did:plc:bob");
    }

    #[test]
    fn oauth_needs_its_key_pair() {
        let session = oauth_session();
        let password = password_session();
        let context = AuthContext::from_sessions(Some(&session), None, Some(&password)).unwrap();
        assert!(matches!(context, AuthContext::AppPassword { .. }));
        assert!(AuthContext::from_sessions(Some(&session), None, None).is_none());

        let key = DpopKeyPair::generate();
        let context = AuthContext::from_sessions(Some(&session), Some(&key), Some(&password)).unwrap();
        assert_eq!(context.base_url(), "https://pds.example");
        assert_eq!(context.repo_did(), "did:plc:alice");
    }
}
