//! Key-value store adapters.
//!
//! The durable store backs sessions and scheduled entries; a second
//! instance rooted in a temp directory plays the short-lived role
//! (encryption key, pending authorizations).

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;
