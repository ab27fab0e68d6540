//! Polling engine for scheduled threads.
//!
//! Every tick lists the persisted entries, rebuilds the images of each due
//! entry from its stored bytes and hands them to the configured
//! [`ScheduledPostHandler`]. One tick runs at a time; a tick that fires
//! while the previous one is still posting is skipped. A handler that
//! errors, panics or outlives `handler_timeout` counts as a failed entry
//! and is settled by the [`FailurePolicy`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use panelpost_core::ScheduledPostHandler;
//! use panelpost_domain::DisplayRegistry;
//! use panelpost_infra::scheduling::{KvSchedulerStore, SchedulerEngine, SchedulerEngineConfig};
//! use panelpost_infra::storage::MemoryStore;
//!
//! # async fn example(handler: Arc<dyn ScheduledPostHandler>) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(KvSchedulerStore::new(Arc::new(MemoryStore::new())));
//! let mut engine =
//!     SchedulerEngine::new(store, handler, DisplayRegistry::new(), SchedulerEngineConfig::default());
//!
//! engine.start().await?;
//! // ... application runs ...
//! engine.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::io::Cursor;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use panelpost_core::{ScheduledPostHandler, SchedulerStore};
use panelpost_domain::{
    ComicImage, DisplayRegistry, FailurePolicy, PanelPostError, ScheduledGroup, ScheduledImage,
    SchedulerConfig, SchedulerEntry,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the scheduler engine
#[derive(Debug, Clone)]
pub struct SchedulerEngineConfig {
    /// Poll interval
    pub interval: Duration,
    /// What to do with an entry whose handler failed
    pub failure_policy: FailurePolicy,
    /// How long `stop` waits for an in-flight tick
    pub join_timeout: Duration,
    /// Upper bound on posting one entry
    pub handler_timeout: Duration,
    /// Upper bound on listing or deleting entries
    pub store_timeout: Duration,
}

impl Default for SchedulerEngineConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for SchedulerEngineConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_seconds.max(1)),
            failure_policy: config.failure_policy,
            join_timeout: Duration::from_secs(30),
            handler_timeout: Duration::from_secs(600),
            store_timeout: Duration::from_secs(30),
        }
    }
}

/// Counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub posted: usize,
    pub failed: usize,
    /// True when another tick was still running and this one did nothing.
    pub skipped: bool,
}

/// Shared state for the polling loop
#[derive(Clone)]
struct TickContext {
    store: Arc<dyn SchedulerStore>,
    handler: Arc<dyn ScheduledPostHandler>,
    registry: DisplayRegistry,
    failure_policy: FailurePolicy,
    handler_timeout: Duration,
    store_timeout: Duration,
    processing: Arc<AtomicBool>,
}

/// Clears the re-entrancy flag when the tick ends, unwinding included.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Interval-driven runner for persisted scheduler entries
pub struct SchedulerEngine {
    context: TickContext,
    config: SchedulerEngineConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<dyn SchedulerStore>,
        handler: Arc<dyn ScheduledPostHandler>,
        registry: DisplayRegistry,
        config: SchedulerEngineConfig,
    ) -> Self {
        Self {
            context: TickContext {
                store,
                handler,
                registry,
                failure_policy: config.failure_policy,
                handler_timeout: config.handler_timeout,
                store_timeout: config.store_timeout,
                processing: Arc::new(AtomicBool::new(false)),
            },
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start polling.
    ///
    /// Runs one tick immediately, then one per interval.
    ///
    /// # Errors
    ///
    /// Returns error if the engine is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval = ?self.config.interval, policy = %self.config.failure_policy, "Starting scheduler");

        // Fresh token so the engine can restart after stop
        self.cancellation_token = CancellationToken::new();

        let context = self.context.clone();
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::poll_loop(context, interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop polling and wait for an in-flight tick.
    ///
    /// # Errors
    ///
    /// Returns error if the engine is not running or the tick outlives the
    /// join timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: join_timeout, source })??;
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// A running engine has a task handle that hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run a single tick now, outside the timer.
    pub async fn run_once(&self) -> TickSummary {
        Self::tick(&self.context).await
    }

    async fn poll_loop(context: TickContext, interval: Duration, cancel: CancellationToken) {
        Self::tick(&context).await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Scheduler loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    Self::tick(&context).await;
                }
            }
        }
    }

    async fn tick(context: &TickContext) -> TickSummary {
        if context
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous tick still running, skipping");
            return TickSummary { skipped: true, ..TickSummary::default() };
        }

        let _guard = ProcessingGuard(&context.processing);

        let started = Instant::now();
        let summary = Self::process_due(context).await;

        if summary.due > 0 {
            info!(
                due = summary.due,
                posted = summary.posted,
                failed = summary.failed,
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Scheduler tick completed"
            );
        }
        summary
    }

    async fn process_due(context: &TickContext) -> TickSummary {
        let entries = match tokio::time::timeout(context.store_timeout, context.store.list()).await {
            Ok(Ok(entries)) => entries,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to list scheduled entries");
                return TickSummary::default();
            }
            Err(_) => {
                error!(timeout = ?context.store_timeout, "Listing scheduled entries timed out");
                return TickSummary::default();
            }
        };

        let now = Utc::now();
        let mut summary = TickSummary::default();
        for entry in entries.iter().filter(|entry| entry.is_due(now)) {
            summary.due += 1;
            if Self::run_entry(context, entry).await {
                summary.posted += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    async fn run_entry(context: &TickContext, entry: &SchedulerEntry) -> bool {
        let groups = entry
            .groups
            .iter()
            .map(|group| rebuild_group(group, &context.registry))
            .collect::<Vec<_>>();

        let handled = AssertUnwindSafe(context.handler.handle(entry, groups)).catch_unwind();
        let outcome = match tokio::time::timeout(context.handler_timeout, handled).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(PanelPostError::Internal(format!(
                "scheduled post handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Err(_) => Err(PanelPostError::Internal(format!(
                "scheduled post handler timed out after {:?}",
                context.handler_timeout
            ))),
        };

        match outcome {
            Ok(()) => {
                info!(entry = %entry.id, title = %entry.title, "Scheduled thread posted");
                Self::remove(context, entry).await;
                true
            }
            Err(e) => {
                warn!(entry = %entry.id, error = %e, policy = %context.failure_policy, "Scheduled thread failed");
                if context.failure_policy == FailurePolicy::DeleteOnFailure {
                    Self::remove(context, entry).await;
                }
                false
            }
        }
    }

    async fn remove(context: &TickContext, entry: &SchedulerEntry) {
        match tokio::time::timeout(context.store_timeout, context.store.delete(&entry.id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(entry = %entry.id, error = %e, "Failed to delete scheduled entry"),
            Err(_) => error!(entry = %entry.id, "Deleting scheduled entry timed out"),
        }
    }
}

impl Drop for SchedulerEngine {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn rebuild_group(group: &ScheduledGroup, registry: &DisplayRegistry) -> Vec<ComicImage> {
    group
        .images
        .iter()
        .enumerate()
        .map(|(index, image)| rebuild_image(&group.id, index, image, registry))
        .collect()
}

fn rebuild_image(
    group_id: &str,
    index: usize,
    image: &ScheduledImage,
    registry: &DisplayRegistry,
) -> ComicImage {
    let (width, height) = match (image.width, image.height) {
        (Some(w), Some(h)) => (Some(w), Some(h)),
        _ => match probe_dimensions(&image.file_data) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        },
    };

    ComicImage::new(
        format!("{group_id}-{}-{}", image.id, Uuid::new_v4()),
        image.name.clone(),
        index,
        image.mime_type.clone(),
        image.file_data.clone(),
    )
    .with_alt_text(image.alt_text.clone())
    .with_dimensions(width, height)
    .with_display(registry)
}

/// Header-only dimension probe; `None` when the bytes don't decode.
fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data)).with_guessed_format().ok()?.into_dimensions().ok()
}
