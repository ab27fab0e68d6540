//! The authorization attempt in flight between redirect and callback.
//!
//! Lives in the short-lived store only; it holds the PKCE verifier and the
//! private DPoP key the resulting tokens will be bound to.

use std::sync::Arc;

use panelpost_common::{DpopKeyPair, SerializedKeyPair};
use panelpost_core::errors::map_dpop;
use panelpost_core::KeyValueStore;
use panelpost_domain::constants::PENDING_FLOW_KEY;
use panelpost_domain::{OAuthConfig, PanelPostError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::oauth::AuthorizationPreparation;
use crate::errors::InfraError;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingAuthorization {
    pub code_verifier: String,
    pub state: String,
    pub config: OAuthConfig,
    pub key_pair: DpopKeyPair,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPending {
    code_verifier: String,
    state: String,
    config: OAuthConfig,
    dpop: SerializedKeyPair,
}

#[derive(Clone)]
pub struct PendingAuthorizationStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for PendingAuthorizationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthorizationStore").finish_non_exhaustive()
    }
}

impl PendingAuthorizationStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Remember `prepared` for `config`, replacing any earlier attempt.
    pub async fn store(&self, prepared: &AuthorizationPreparation, config: &OAuthConfig) -> Result<()> {
        let record = StoredPending {
            code_verifier: prepared.code_verifier.clone(),
            state: prepared.state.clone(),
            config: config.clone(),
            dpop: prepared.key_pair.export(),
        };
        let json = serde_json::to_string(&record).map_err(InfraError::from)?;
        self.store.set(PENDING_FLOW_KEY, json).await
    }

    /// The stored attempt, if any.
    ///
    /// A record that cannot be parsed or whose key does not import is
    /// reported as absent.
    pub async fn restore(&self) -> Result<Option<PendingAuthorization>> {
        let Some(raw) = self.store.get(PENDING_FLOW_KEY).await? else {
            return Ok(None);
        };

        let restored = serde_json::from_str::<StoredPending>(&raw)
            .map_err(|err| PanelPostError::from(InfraError::from(err)))
            .and_then(|record| -> Result<PendingAuthorization> {
                let key_pair = DpopKeyPair::import(&record.dpop).map_err(map_dpop)?;
                Ok(PendingAuthorization {
                    code_verifier: record.code_verifier,
                    state: record.state,
                    config: record.config,
                    key_pair,
                })
            });

        match restored {
            Ok(pending) => Ok(Some(pending)),
            Err(err) => {
                warn!(error = %err, "Failed to restore pending authorization");
                Ok(None)
            }
        }
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(PENDING_FLOW_KEY).await
    }
}
