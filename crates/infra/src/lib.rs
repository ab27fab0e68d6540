//! # PanelPost Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The reqwest-based HTTP client and the XRPC posting adapter
//! - OAuth (PKCE + DPoP) and app password authentication
//! - Key-value stores (memory and JSON files) and sealed session persistence
//! - Image intake, analysis and re-encoding (`image` crate)
//! - The scheduler store and polling engine
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `panelpost-core`
//! - Depends on `panelpost-common`, `panelpost-domain` and `panelpost-core`
//! - Contains all "impure" code (network, filesystem, codecs)

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod ingest;
pub mod scheduling;
pub mod storage;

// Re-export commonly used items
pub use api::XrpcClient;
pub use auth::{AtProtoRefresher, OAuthClient, PasswordAuthClient, SessionPersistence};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use ingest::ImageReencoder;
pub use scheduling::{KvSchedulerStore, SchedulerEngine, SchedulerEngineConfig};
pub use storage::{FileStore, MemoryStore};
