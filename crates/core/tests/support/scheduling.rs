use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use panelpost_core::SchedulerStore;
use panelpost_domain::{Result as DomainResult, SchedulerEntry};

/// In-memory `SchedulerStore` with upsert semantics.
#[derive(Default, Clone)]
pub struct MemorySchedulerStore {
    entries: Arc<Mutex<Vec<SchedulerEntry>>>,
}

impl MemorySchedulerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulerStore for MemorySchedulerStore {
    async fn list(&self) -> DomainResult<Vec<SchedulerEntry>> {
        let mut entries = self.entries.lock().unwrap().clone();
        entries.sort_by_key(|entry| entry.scheduled_at);
        Ok(entries)
    }

    async fn put(&self, entry: SchedulerEntry) -> DomainResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|existing| existing.id != entry.id);
        entries.push(entry);
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.entries.lock().unwrap().retain(|entry| entry.id != id);
        Ok(())
    }

    async fn clear(&self) -> DomainResult<()> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}
