//! Key-value storage port
//!
//! Sessions, pending authorizations and scheduler entries are all persisted
//! as string values under fixed keys. Two stores exist at runtime: a durable
//! one and a short-lived one whose contents decay with the login session.

use async_trait::async_trait;
use panelpost_domain::Result;

/// String key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
