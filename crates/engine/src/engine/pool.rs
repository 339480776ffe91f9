//! Shared execution pool
//!
//! A fixed number of slots (semaphore permits) shared by every worker's poll
//! loop. Acquiring a slot is the backpressure point: when all slots are busy
//! the submitting tick waits instead of queueing more work.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio_util::task::TaskTracker;

pub(crate) struct ExecutionPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    tracker: TaskTracker,
}

impl ExecutionPool {
    /// Create a pool with `capacity` slots
    ///
    /// The capacity never changes afterwards.
    pub(crate) fn new(capacity: usize) -> Self {
        let tracker = TaskTracker::new();
        // Closed while the engine is not running so a drain wait on a never
        // started engine resolves immediately.
        tracker.close();

        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            tracker,
        }
    }

    /// Wait for a free slot
    pub(crate) async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.slots).acquire_owned().await
    }

    /// Run `execution` in its own task, holding `permit` until it finishes
    pub(crate) fn spawn<F>(&self, permit: OwnedSemaphorePermit, execution: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(async move {
            execution.await;
            drop(permit);
        });
    }

    pub(crate) fn open(&self) {
        self.tracker.reopen();
    }

    pub(crate) fn close(&self) {
        self.tracker.close();
    }

    /// Resolve once the pool is closed and every execution has finished
    pub(crate) async fn drained(&self) {
        self.tracker.wait().await
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    pub(crate) fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_slots_bound_executions() {
        let pool = ExecutionPool::new(1);
        pool.open();

        let permit = pool.acquire().await.unwrap();
        assert_eq!(pool.available_slots(), 0);

        let (release_tx, release_rx) = oneshot::channel::<()>();
        pool.spawn(permit, async move {
            let _ = release_rx.await;
        });

        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err(), "second acquire should wait for a free slot");

        release_tx.send(()).unwrap();
        let permit = tokio::time::timeout(Duration::from_secs(1), pool.acquire())
            .await
            .expect("slot should free up")
            .unwrap();
        drop(permit);
        assert_eq!(pool.available_slots(), pool.capacity());
    }

    #[tokio::test]
    async fn test_drained_waits_for_executions() {
        let pool = ExecutionPool::new(2);
        pool.open();

        let permit = pool.acquire().await.unwrap();
        pool.spawn(permit, tokio::time::sleep(Duration::from_millis(50)));
        assert_eq!(pool.in_flight(), 1);

        pool.close();
        tokio::time::timeout(Duration::from_secs(1), pool.drained())
            .await
            .expect("pool should drain");
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_new_pool_is_drained() {
        let pool = ExecutionPool::new(3);
        tokio::time::timeout(Duration::from_millis(100), pool.drained())
            .await
            .expect("unused pool should already be drained");
    }
}
