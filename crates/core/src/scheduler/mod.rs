//! Deferred posting: entry construction and the ports the engine runs on.

pub mod entry;
pub mod ports;

pub use entry::{build_scheduler_entry, first_post_title, plan_from_groups};
pub use ports::{ScheduledPostHandler, SchedulerStore};
