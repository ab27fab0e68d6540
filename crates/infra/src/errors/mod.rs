//! Infrastructure error plumbing.

mod conversions;

pub use conversions::InfraError;
pub(crate) use conversions::domain;
