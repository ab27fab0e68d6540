//! Core ports implemented on top of the application context.

pub mod scheduled_post;

pub use scheduled_post::ScheduledThreadHandler;
