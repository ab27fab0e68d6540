//! Pure helpers shared across crates

pub mod at_uri;
pub mod base64_serde;
pub mod chunk;
pub mod filename;
