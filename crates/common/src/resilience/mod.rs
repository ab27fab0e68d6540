//! Resilience primitives for the upload pipeline
//!
//! - **Retry**: exponential backoff with additive jitter, returning the last
//!   error unchanged once attempts run out
//! - **Admission gate**: a counting semaphore with FIFO admission that bounds
//!   concurrent uploads

pub mod gate;
pub mod retry;

pub use gate::AdmissionGate;
pub use retry::{
    policies, retry_with_backoff, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder,
    RetryDecision, RetryExecutor, RetryPolicy,
};
