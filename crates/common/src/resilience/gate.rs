//! Counting admission gate with FIFO fairness.
//!
//! Wraps a tokio [`Semaphore`], which queues waiters in arrival order. A
//! permit is held for the duration of the guarded future and released when
//! it completes, errors, or is dropped mid-flight.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::error::{CommonError, CommonResult};

/// Bounds how many futures run at once.
///
/// # Examples
///
/// ```rust
/// use panelpost_common::resilience::AdmissionGate;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gate = AdmissionGate::new(3)?;
/// let value = gate.run(async { 42 }).await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` concurrent holders.
    pub fn new(capacity: usize) -> CommonResult<Self> {
        if capacity == 0 {
            return Err(CommonError::validation("capacity", "must be greater than 0"));
        }
        Ok(Self { semaphore: Arc::new(Semaphore::new(capacity)), capacity })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot. Waiters are admitted in arrival order.
    pub async fn acquire(&self) -> CommonResult<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).acquire_owned().await.map_err(closed)
    }

    /// Run `future` while holding a slot.
    pub async fn run<F, T>(&self, future: F) -> CommonResult<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        trace!(available = self.available(), "Admitted through gate");
        Ok(future.await)
    }
}

fn closed(_: AcquireError) -> CommonError {
    CommonError::internal_with_context("semaphore closed", "admission gate")
}

#[cfg(test)]
mod tests {
    //! Unit tests for the admission gate.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::future::join_all;
    use tokio::sync::Mutex;

    use super::*;

    /// Validates the concurrency bound.
    ///
    /// Assertions:
    /// - No more than `capacity` futures are ever inside the gate.
    #[tokio::test(start_paused = true)]
    async fn never_exceeds_capacity() {
        let gate = AdmissionGate::new(3).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..10).map(|_| {
            let gate = gate.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                gate.run(async {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }
        });
        join_all(tasks).await;

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(gate.available(), 3);
    }

    /// Validates FIFO admission when saturated.
    ///
    /// Assertions:
    /// - Waiters enter in the order they queued.
    #[tokio::test]
    async fn admits_waiters_in_arrival_order() {
        let gate = AdmissionGate::new(1).unwrap();
        let held = gate.acquire().await.unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..4 {
            let gate = gate.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                gate.run(async { order.lock().await.push(i) }).await.unwrap();
            }));
            // Let each waiter enqueue before spawning the next one.
            tokio::task::yield_now().await;
        }

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().await, vec![0, 1, 2, 3]);
    }

    /// Validates release on failure paths.
    ///
    /// Assertions:
    /// - A guarded future returning an error still frees its slot.
    #[tokio::test]
    async fn releases_slot_when_future_fails() {
        let gate = AdmissionGate::new(1).unwrap();
        let result: Result<(), &str> = gate.run(async { Err("boom") }).await.unwrap();
        assert!(result.is_err());
        assert_eq!(gate.available(), 1);
    }

    /// Validates configuration checks.
    #[test]
    fn zero_capacity_is_rejected() {
        assert!(AdmissionGate::new(0).is_err());
    }
}
