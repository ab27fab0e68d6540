//! # PanelPost Domain
//!
//! Business domain types and models for PanelPost.
//!
//! This crate contains:
//! - Domain data types (ComicImage, PostPlan, sessions, scheduler entries)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants and pure helpers (filenames, AT URIs, chunking)
//!
//! ## Architecture
//! - No dependencies on other PanelPost crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::at_uri::at_uri_to_bsky_app_url;
pub use utils::chunk::chunk;
pub use utils::filename::{natural_compare, parse_sequence_number, sort_by_sequence};
