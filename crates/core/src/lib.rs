//! # PanelPost Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The authentication capability (`AuthContext`) and token freshness policy
//! - Plan building and alt-text templating
//! - The upload-and-thread orchestrator (`PosterService`)
//! - Scheduler entry construction
//! - Port/adapter interfaces (traits) for everything impure
//!
//! ## Architecture Principles
//! - Only depends on `panelpost-common` and `panelpost-domain`
//! - No filesystem, HTTP, or image codec code
//! - All external dependencies via traits

pub mod auth;
pub mod editor;
pub mod errors;
pub mod poster;
pub mod scheduler;

// Infrastructure ports
pub mod storage_ports;

pub use auth::{
    build_dpop_auth_header, ensure_fresh_auth_context, AuthContext, AuthHeaders, CachedSession,
    FreshAuth, FreshnessInput, SessionCache, TokenRefresher,
};
pub use editor::update_alt_texts;
pub use poster::{
    build_post_plan, ImageCompressor, PassThroughCompressor, PostOptions, PosterService,
    PostingApi,
};
pub use scheduler::{
    build_scheduler_entry, first_post_title, plan_from_groups, ScheduledPostHandler,
    SchedulerStore,
};
pub use storage_ports::KeyValueStore;
