//! Sealed persistence of signed-in sessions.
//!
//! Records live in the durable store as `{iv, data, storedAt}` where `data`
//! is the base64 AES-256-GCM ciphertext of the JSON payload. The key itself
//! is kept only in the short-lived store, so a durable record outliving its
//! key is unreadable and treated as absent.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use panelpost_common::{DpopKeyPair, EncryptedData, EncryptionService, SerializedKeyPair};
use panelpost_core::errors::{map_common, map_dpop};
use panelpost_core::{CachedSession, KeyValueStore, SessionCache};
use panelpost_domain::constants::{APP_PASSWORD_STORE_KEY, SESSION_AES_KEY, SESSION_STORE_KEY};
use panelpost_domain::{AppPasswordSession, OAuthSession, PanelPostError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::now_ms;
use crate::errors::{domain, InfraError};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SealedRecord {
    iv: Vec<u8>,
    data: String,
    stored_at: i64,
}

#[derive(Serialize, Deserialize)]
struct OAuthPayload {
    session: OAuthSession,
    dpop: SerializedKeyPair,
}

/// Reads and writes sessions, keeping the [`SessionCache`] in step.
#[derive(Clone)]
pub struct SessionPersistence {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    cache: SessionCache,
}

impl std::fmt::Debug for SessionPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPersistence").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl SessionPersistence {
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        ephemeral: Arc<dyn KeyValueStore>,
        cache: SessionCache,
    ) -> Self {
        Self { durable, ephemeral, cache }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Seal `session` and its key pair under a fresh IV.
    #[instrument(skip_all, fields(did = %session.active_did))]
    pub async fn persist(&self, session: &OAuthSession, key_pair: &DpopKeyPair) -> Result<()> {
        let payload = OAuthPayload { session: session.clone(), dpop: key_pair.export() };
        self.seal(SESSION_STORE_KEY, &payload).await?;
        self.cache.set(session.clone(), key_pair.clone());
        debug!("session persisted");
        Ok(())
    }

    /// Restore the OAuth session, if one is stored and readable.
    ///
    /// Any failure after both the key and the record are found (bad
    /// ciphertext, bad JSON, bad key material) wipes the stored session.
    pub async fn load(&self) -> Result<Option<CachedSession>> {
        let opened = match self.open::<OAuthPayload>(SESSION_STORE_KEY).await? {
            None => return Ok(None),
            Some(opened) => opened,
        };

        let restored = opened.and_then(|payload| -> Result<CachedSession> {
            let key_pair = DpopKeyPair::import(&payload.dpop).map_err(map_dpop)?;
            Ok(CachedSession { session: payload.session, key_pair })
        });

        match restored {
            Ok(cached) => {
                self.cache.set(cached.session.clone(), cached.key_pair.clone());
                Ok(Some(cached))
            }
            Err(err) => {
                warn!(error = %err, "Failed to load persisted session");
                self.clear().await?;
                Ok(None)
            }
        }
    }

    /// Remove the stored OAuth session and its key, and empty the cache.
    pub async fn clear(&self) -> Result<()> {
        self.durable.remove(SESSION_STORE_KEY).await?;
        self.ephemeral.remove(SESSION_AES_KEY).await?;
        self.cache.clear();
        Ok(())
    }

    pub async fn persist_app_password(&self, session: &AppPasswordSession) -> Result<()> {
        self.seal(APP_PASSWORD_STORE_KEY, session).await?;
        self.cache.set_app_password(session.clone());
        Ok(())
    }

    /// Restore the password session; an unreadable record is dropped.
    pub async fn load_app_password(&self) -> Result<Option<AppPasswordSession>> {
        match self.open::<AppPasswordSession>(APP_PASSWORD_STORE_KEY).await? {
            None => Ok(None),
            Some(Ok(session)) => {
                self.cache.set_app_password(session.clone());
                Ok(Some(session))
            }
            Some(Err(err)) => {
                warn!(error = %err, "Failed to load password session");
                self.durable.remove(APP_PASSWORD_STORE_KEY).await?;
                Ok(None)
            }
        }
    }

    pub async fn clear_app_password(&self) -> Result<()> {
        self.durable.remove(APP_PASSWORD_STORE_KEY).await
    }

    async fn seal<T: Serialize>(&self, key: &str, payload: &T) -> Result<()> {
        let cipher = self.encryption(true).await?.ok_or_else(|| {
            PanelPostError::Internal("session encryption key unavailable".into())
        })?;
        let plaintext = serde_json::to_vec(payload).map_err(InfraError::from)?;
        let sealed = cipher.encrypt(&plaintext).map_err(map_common)?;
        let record = SealedRecord {
            iv: sealed.nonce,
            data: BASE64.encode(sealed.ciphertext),
            stored_at: now_ms(),
        };
        let json = serde_json::to_string(&record).map_err(InfraError::from)?;
        self.durable.set(key, json).await
    }

    /// `None` when the key or the record is missing; otherwise the outcome
    /// of decrypting and parsing, left for the caller to act on.
    async fn open<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Result<T>>> {
        let cipher = match self.encryption(false).await {
            Ok(Some(cipher)) => cipher,
            Ok(None) => return Ok(None),
            Err(err) => {
                if self.durable.get(key).await?.is_none() {
                    return Ok(None);
                }
                return Ok(Some(Err(err)));
            }
        };
        let Some(raw) = self.durable.get(key).await? else {
            return Ok(None);
        };

        Ok(Some(unseal(&cipher, &raw)))
    }

    /// The session cipher. With `create`, a missing key is generated and
    /// stored first.
    async fn encryption(&self, create: bool) -> Result<Option<EncryptionService>> {
        if let Some(encoded) = self.ephemeral.get(SESSION_AES_KEY).await? {
            return EncryptionService::from_base64_key(&encoded).map(Some).map_err(map_common);
        }
        if !create {
            return Ok(None);
        }
        let cipher = EncryptionService::new(EncryptionService::generate_key()).map_err(map_common)?;
        self.ephemeral.set(SESSION_AES_KEY, cipher.export_key()).await?;
        Ok(Some(cipher))
    }
}

fn unseal<T: DeserializeOwned>(cipher: &EncryptionService, raw: &str) -> Result<T> {
    let record: SealedRecord = serde_json::from_str(raw).map_err(domain)?;
    let ciphertext = BASE64
        .decode(record.data.as_bytes())
        .map_err(|err| PanelPostError::Security(format!("sealed session is not base64: {err}")))?;
    let plaintext =
        cipher.decrypt(&EncryptedData { nonce: record.iv, ciphertext }).map_err(map_common)?;
    serde_json::from_slice(&plaintext).map_err(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    struct Fixture {
        durable: MemoryStore,
        ephemeral: MemoryStore,
        persistence: SessionPersistence,
    }

    fn fixture() -> Fixture {
        let durable = MemoryStore::new();
        let ephemeral = MemoryStore::new();
        let persistence = SessionPersistence::new(
            Arc::new(durable.clone()),
            Arc::new(ephemeral.clone()),
            SessionCache::new(),
        );
        Fixture { durable, ephemeral, persistence }
    }

    fn session() -> OAuthSession {
        OAuthSession {
            access_token: "access-secret".into(),
            refresh_token: Some("refresh-secret".into()),
            active_did: "did:plc:alice".into(),
            expires_at: 1_700_000_000_000,
            pds_url: "https://pds.example".into(),
        }
    }

    #[tokio::test]
    async fn persisted_session_loads_back_with_key_pair() {
        let fx = fixture();
        let key_pair = DpopKeyPair::generate();
        fx.persistence.persist(&session(), &key_pair).await.unwrap();
        fx.persistence.cache().clear();

        let loaded = fx.persistence.load().await.unwrap().unwrap();
        assert_eq!(loaded.session, session());
        assert_eq!(loaded.key_pair, key_pair);
        assert_eq!(fx.persistence.cache().get().unwrap().session, session());
    }

    #[tokio::test]
    async fn durable_record_holds_no_plaintext_tokens() {
        let fx = fixture();
        fx.persistence.persist(&session(), &DpopKeyPair::generate()).await.unwrap();

        let raw = fx.durable.get(SESSION_STORE_KEY).await.unwrap().unwrap();
        assert!(!raw.contains("access-secret"));
        let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(record["iv"].as_array().unwrap().len(), 12);
        assert!(record["storedAt"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn each_persist_uses_a_fresh_iv() {
        let fx = fixture();
        let key_pair = DpopKeyPair::generate();
        fx.persistence.persist(&session(), &key_pair).await.unwrap();
        let first = fx.durable.get(SESSION_STORE_KEY).await.unwrap().unwrap();
        fx.persistence.persist(&session(), &key_pair).await.unwrap();
        let second = fx.durable.get(SESSION_STORE_KEY).await.unwrap().unwrap();

        let iv = |raw: &str| serde_json::from_str::<serde_json::Value>(raw).unwrap()["iv"].clone();
        assert_ne!(iv(&first), iv(&second));
    }

    #[tokio::test]
    async fn missing_key_means_no_session() {
        let fx = fixture();
        fx.persistence.persist(&session(), &DpopKeyPair::generate()).await.unwrap();
        fx.ephemeral.remove(SESSION_AES_KEY).await.unwrap();

        assert!(fx.persistence.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_wiped() {
        let fx = fixture();
        fx.persistence.persist(&session(), &DpopKeyPair::generate()).await.unwrap();
        fx.durable
            .set(SESSION_STORE_KEY, r#"{"iv":[0,0,0,0,0,0,0,0,0,0,0,0],"data":"AAAA","storedAt":1}"#.into())
            .await
            .unwrap();

        assert!(fx.persistence.load().await.unwrap().is_none());
        assert!(fx.durable.get(SESSION_STORE_KEY).await.unwrap().is_none());
        assert!(fx.ephemeral.get(SESSION_AES_KEY).await.unwrap().is_none());
        assert!(fx.persistence.cache().get().is_none());
    }

    #[tokio::test]
    async fn app_password_session_round_trips_sealed() {
        let fx = fixture();
        let session = AppPasswordSession {
            service: "https://bsky.social".into(),
            did: "did:plc:bob".into(),
            handle: "bob.example".into(),
            access_jwt: "jwt-secret".into(),
            refresh_jwt: Some("refresh".into()),
        };
        fx.persistence.persist_app_password(&session).await.unwrap();
        assert!(!fx.durable.get(APP_PASSWORD_STORE_KEY).await.unwrap().unwrap().contains("jwt-secret"));

        assert_eq!(fx.persistence.load_app_password().await.unwrap(), Some(session));
        fx.persistence.clear_app_password().await.unwrap();
        assert_eq!(fx.persistence.load_app_password().await.unwrap(), None);
    }
}
