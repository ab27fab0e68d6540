//! Deferred posting.
//!
//! [`KvSchedulerStore`] keeps entries in the durable key-value store;
//! [`SchedulerEngine`] polls it and hands due entries to a
//! [`ScheduledPostHandler`](panelpost_core::ScheduledPostHandler).

pub mod comic_scheduler;
pub mod error;
pub mod store;

pub use comic_scheduler::{SchedulerEngine, SchedulerEngineConfig, TickSummary};
pub use error::{SchedulerError, SchedulerResult};
pub use store::KvSchedulerStore;
