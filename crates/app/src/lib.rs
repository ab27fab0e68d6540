//! # PanelPost Application
//!
//! Composition root for the `panelpost` binary.
//!
//! - [`AppContext`]: wires configuration, stores, clients and the session
//!   cache together
//! - [`commands`]: the user-facing actions (sign in, post, schedule)
//! - [`adapters`]: core ports implemented on top of the context
//! - [`utils`]: tracing setup and command logging

pub mod adapters;
pub mod commands;
pub mod context;
pub mod utils;

pub use adapters::ScheduledThreadHandler;
pub use context::AppContext;
