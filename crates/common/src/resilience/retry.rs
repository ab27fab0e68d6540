//! Retry with exponential backoff and jitter.
//!
//! Jitter keeps images that fail together from retrying in lockstep.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument, warn};

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation with a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide whether the error is worth another attempt.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: initial_delay * base^attempt, capped at max_delay
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0-based).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = initial_delay.as_millis() as f64 * base.powi(exponent);
                let delay_ms = delay.min(max_delay.as_millis() as f64) as u64;
                Duration::from_millis(delay_ms)
            }
        }
    }
}

/// Jitter added on top of the backoff delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Adds a uniform random delay in `0..max`
    Additive { max: Duration },
}

impl Jitter {
    /// Apply jitter to the calculated delay
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Additive { max } => {
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                if max_ms == 0 {
                    return delay;
                }
                delay + Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    pub retries: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Jitter type for randomizing delays
    pub jitter: Jitter,
}

impl Default for RetryConfig {
    /// Four retries, 500 ms doubling, up to 250 ms jitter.
    fn default() -> Self {
        Self {
            retries: 4,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(500),
                base: 2.0,
                max_delay: Duration::from_secs(30),
            },
            jitter: Jitter::Additive { max: Duration::from_millis(250) },
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration builder
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }
}

/// Builder for retry configuration
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    #[must_use]
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    #[must_use]
    pub fn exponential_backoff(mut self, initial_delay: Duration, base: f64) -> Self {
        self.config.backoff =
            BackoffStrategy::Exponential { initial_delay, base, max_delay: Duration::from_secs(30) };
        self
    }

    #[must_use]
    pub fn jitter(mut self, max: Duration) -> Self {
        self.config.jitter = Jitter::Additive { max };
        self
    }

    #[must_use]
    pub fn no_jitter(mut self) -> Self {
        self.config.jitter = Jitter::None;
        self
    }

    #[must_use]
    pub fn build(self) -> RetryConfig {
        self.config
    }
}

/// Retry executor pairing a configuration with a policy.
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Run `operation` until it succeeds, the policy stops, or retries run
    /// out. The last error is returned unchanged.
    #[instrument(skip(self, operation), fields(retries = self.config.retries))]
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if attempt >= self.config.retries {
                        warn!(attempts = attempt + 1, error = %error, "Retry attempts exhausted");
                        return Err(error);
                    }
                    let delay = match self.policy.should_retry(&error, attempt) {
                        RetryDecision::Stop => {
                            debug!(error = %error, "Error is not retryable");
                            return Err(error);
                        }
                        RetryDecision::Retry => {
                            self.config.jitter.apply(self.config.backoff.calculate_delay(attempt))
                        }
                        RetryDecision::RetryAfter(delay) => delay,
                    };
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Retry any error with the given configuration.
pub async fn retry_with_backoff<F, Fut, T, E>(config: RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryExecutor::new(config, policies::AlwaysRetry).execute(operation).await
}

/// Pre-defined retry policies
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retries on any error
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug, Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if (self.predicate)(error) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for retry backoff, jitter and the executor.

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::policies::PredicateRetry;
    use super::*;

    fn fast_config(retries: u32) -> RetryConfig {
        RetryConfig::builder()
            .retries(retries)
            .fixed_backoff(Duration::from_millis(1))
            .no_jitter()
            .build()
    }

    /// Validates exponential delays for the default configuration.
    ///
    /// Assertions:
    /// - Delays are 500, 1000, 2000, 4000 ms for attempts 0..4.
    #[test]
    fn default_backoff_doubles_from_500ms() {
        let config = RetryConfig::default();
        let delays: Vec<u128> =
            (0..4).map(|a| config.backoff.calculate_delay(a).as_millis()).collect();
        assert_eq!(delays, [500, 1000, 2000, 4000]);
        assert_eq!(config.retries, 4);
    }

    /// Validates the additive jitter range.
    ///
    /// Assertions:
    /// - Jittered delay stays within `[delay, delay + 250ms)`.
    #[test]
    fn additive_jitter_stays_in_range() {
        let jitter = Jitter::Additive { max: Duration::from_millis(250) };
        for _ in 0..100 {
            let delay = jitter.apply(Duration::from_millis(500));
            assert!(delay >= Duration::from_millis(500));
            assert!(delay < Duration::from_millis(750));
        }
        assert_eq!(Jitter::None.apply(Duration::from_millis(5)), Duration::from_millis(5));
    }

    /// Validates success after transient failures.
    ///
    /// Assertions:
    /// - The operation runs three times and returns the final value.
    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<u32, String> = retry_with_backoff(fast_config(4), || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("fail {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    /// Validates exhaustion behavior.
    ///
    /// Assertions:
    /// - `retries + 1` attempts are made and the last error is returned
    ///   unchanged.
    #[tokio::test]
    async fn returns_last_error_unchanged_after_exhaustion() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), String> = retry_with_backoff(fast_config(2), || {
            let counter = Arc::clone(&counter);
            async move { Err(format!("attempt {}", counter.fetch_add(1, Ordering::SeqCst) + 1)) }
        })
        .await;

        assert_eq!(result, Err("attempt 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    /// Validates that the predicate policy stops on terminal errors.
    ///
    /// Assertions:
    /// - A non-retryable error is returned after a single call.
    #[tokio::test]
    async fn predicate_policy_stops_on_terminal_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let executor =
            RetryExecutor::new(fast_config(4), PredicateRetry::new(|e: &u16| *e >= 500));
        let result: Result<(), u16> = executor
            .execute(|| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(400) }
            })
            .await;

        assert_eq!(result, Err(400));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Validates backoff timing under a paused clock.
    ///
    /// Assertions:
    /// - Default config waits at least 500 + 1000 ms across two retries.
    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), String> = retry_with_backoff(RetryConfig::default(), || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("503".to_string())
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(start.elapsed() < Duration::from_millis(2000));
    }
}
