//! Symmetric encryption for data kept at rest.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService};
