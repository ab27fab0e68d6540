//! Managing and running scheduled threads.

use std::future::Future;
use std::sync::Arc;

use panelpost_core::SchedulerStore;
use panelpost_domain::{PanelPostError, Result, SchedulerEntry};
use tracing::info;

use crate::AppContext;

/// Stored entries, soonest first.
pub async fn list_scheduled(context: &AppContext) -> Result<Vec<SchedulerEntry>> {
    context.scheduler_store.list().await
}

/// Remove the entry with `id`.
///
/// # Errors
///
/// `NotFound` when no such entry exists.
pub async fn cancel_scheduled(context: &AppContext, id: &str) -> Result<()> {
    let entries = context.scheduler_store.list().await?;
    if !entries.iter().any(|entry| entry.id == id) {
        return Err(PanelPostError::NotFound(format!("Scheduled entry {id}")));
    }
    context.scheduler_store.delete(id).await?;
    info!(entry = id, "Scheduled entry cancelled");
    Ok(())
}

/// Poll for due entries until `shutdown` resolves.
pub async fn run_scheduler(context: Arc<AppContext>, shutdown: impl Future<Output = ()>) -> Result<()> {
    let mut engine = context.scheduler_engine();
    engine.start().await?;
    shutdown.await;
    engine.stop().await?;
    Ok(())
}
