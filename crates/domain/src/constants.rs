//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Plan building
pub const CHUNK_SIZE: usize = 4;
pub const DEFAULT_SCHEDULED_TITLE: &str = "Scheduled thread";

// Token lifecycle
pub const REFRESH_THRESHOLD_MS: i64 = 2 * 60_000;
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// Upload pipeline
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 3;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 900_000;
pub const UPLOAD_MAX_ATTEMPTS: u32 = 4;
pub const UPLOAD_RETRY_STEP_MS: u64 = 1000;

// Remote API retry (retry_with_backoff defaults)
pub const API_RETRIES: u32 = 4;
pub const API_BASE_DELAY_MS: u64 = 500;
pub const API_BACKOFF_FACTOR: u32 = 2;
pub const API_MAX_JITTER_MS: u64 = 250;

// Scheduler
pub const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 30;

// Record vocabulary
pub const POST_COLLECTION: &str = "app.bsky.feed.post";
pub const IMAGES_EMBED_TYPE: &str = "app.bsky.embed.images";
pub const BLOB_TYPE: &str = "blob";

// XRPC methods
pub const XRPC_UPLOAD_BLOB: &str = "com.atproto.repo.uploadBlob";
pub const XRPC_CREATE_RECORD: &str = "com.atproto.repo.createRecord";
pub const XRPC_CREATE_SESSION: &str = "com.atproto.server.createSession";
pub const XRPC_REFRESH_SESSION: &str = "com.atproto.server.refreshSession";

// Storage keys
pub const SESSION_STORE_KEY: &str = "oauth_session_v1";
pub const SESSION_AES_KEY: &str = "oauth_session_aes_key";
pub const APP_PASSWORD_STORE_KEY: &str = "app_password_session_v1";
pub const PENDING_FLOW_KEY: &str = "oauth_pending_flow";
pub const SCHEDULER_STORE_KEY: &str = "scheduler_entries_v1";
