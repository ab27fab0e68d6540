use std::sync::Arc;

use async_trait::async_trait;
use panelpost_core::{KeyValueStore, SchedulerStore};
use panelpost_domain::constants::SCHEDULER_STORE_KEY;
use panelpost_domain::{Result, SchedulerEntry};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::domain;

/// All entries as one JSON array under a single key.
///
/// Mutations are read-modify-write; within a process they are serialized,
/// across processes the last writer wins.
#[derive(Clone)]
pub struct KvSchedulerStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for KvSchedulerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvSchedulerStore").finish_non_exhaustive()
    }
}

impl KvSchedulerStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, write_lock: Arc::new(Mutex::new(())) }
    }

    async fn read(&self) -> Result<Vec<SchedulerEntry>> {
        match self.store.get(SCHEDULER_STORE_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(domain),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, entries: &[SchedulerEntry]) -> Result<()> {
        let json = serde_json::to_string(entries).map_err(domain)?;
        self.store.set(SCHEDULER_STORE_KEY, json).await
    }
}

#[async_trait]
impl SchedulerStore for KvSchedulerStore {
    async fn list(&self) -> Result<Vec<SchedulerEntry>> {
        let mut entries = self.read().await?;
        entries.sort_by_key(|entry| entry.scheduled_at);
        Ok(entries)
    }

    async fn put(&self, entry: SchedulerEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read().await?;
        match entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        debug!(count = entries.len(), "stored scheduler entry");
        self.write(&entries).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read().await?;
        entries.retain(|entry| entry.id != id);
        self.write(&entries).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&[]).await
    }
}
