//! Port interfaces for the scheduler
//!
//! The engine lists due entries from a [`SchedulerStore`] and hands each
//! one to a [`ScheduledPostHandler`] together with its rebuilt images.

use async_trait::async_trait;
use panelpost_domain::{ComicImage, Result, SchedulerEntry};

/// Durable table of scheduler entries.
#[async_trait]
pub trait SchedulerStore: Send + Sync {
    /// All entries, ordered by fire time.
    async fn list(&self) -> Result<Vec<SchedulerEntry>>;

    /// Insert `entry`, replacing any entry with the same id.
    async fn put(&self, entry: SchedulerEntry) -> Result<()>;

    /// Delete the entry with `id`. Unknown ids are ignored.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every entry.
    async fn clear(&self) -> Result<()>;
}

/// Performs the posting work for one due entry.
#[async_trait]
pub trait ScheduledPostHandler: Send + Sync {
    /// Post `entry` using `groups`, one image list per persisted group.
    ///
    /// The handler owns the images and releases their display references
    /// whatever the outcome.
    async fn handle(&self, entry: &SchedulerEntry, groups: Vec<Vec<ComicImage>>) -> Result<()>;
}
