//! Authenticated session records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// OAuth session with DPoP-bound tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSession {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub active_did: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
    pub pds_url: String,
}

impl OAuthSession {
    /// True when the access token expires within `threshold_ms` of `now_ms`.
    #[must_use]
    pub fn expires_within(&self, now_ms: i64, threshold_ms: i64) -> bool {
        self.expires_at <= now_ms + threshold_ms
    }
}

impl fmt::Debug for OAuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("active_did", &self.active_did)
            .field("expires_at", &self.expires_at)
            .field("pds_url", &self.pds_url)
            .finish()
    }
}

/// Session obtained through `createSession` with an app password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPasswordSession {
    pub service: String,
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_jwt: Option<String>,
}

impl fmt::Debug for AppPasswordSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppPasswordSession")
            .field("service", &self.service)
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("access_jwt", &"[REDACTED]")
            .field("refresh_jwt", &self.refresh_jwt.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
