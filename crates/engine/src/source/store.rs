//! TaskSource trait definition

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;

/// Where workers find their outstanding tasks
///
/// The engine polls a source on behalf of every configured worker and
/// acknowledges each task that executed successfully. Sources are never
/// pushed to.
///
/// # Contract
///
/// - [`find_requested`](Self::find_requested) is called repeatedly and
///   concurrently from different workers' poll loops. It should return
///   promptly: a query that hangs stalls only that worker's loop, but it
///   stalls it for good.
/// - An empty result is the normal "no work" outcome, not an error.
/// - A task stays outstanding until the source itself removes it. The engine
///   never retries; a failed task is redelivered only if the source keeps
///   reporting it. A source that expires tasks on its own can lose them.
/// - The engine acknowledges through
///   [`mark_completed_by`](Self::mark_completed_by), at most once per
///   successful execution. It forwards to
///   [`mark_completed`](Self::mark_completed) unless overridden; override it
///   when equal tasks can be requested for more than one worker.
/// - If acknowledgment fails, the engine still treats the task as executed,
///   so a source that re-offers the task will see it executed again
///   (at-least-once delivery). Make acknowledgment idempotent.
///
/// # Example
///
/// ```ignore
/// struct PendingCharges { pool: PgPool }
///
/// #[async_trait]
/// impl TaskSource<Charge> for PendingCharges {
///     async fn find_requested(&self, worker: &str) -> Result<Vec<Charge>, SourceError> {
///         load_requested(&self.pool, worker).await.map_err(|e| SourceError::Unavailable(e.to_string()))
///     }
///
///     async fn mark_completed(&self, charge: &Charge) -> Result<(), SourceError> {
///         mark_done(&self.pool, charge.id).await.map_err(anyhow::Error::from)?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait TaskSource<T>: Send + Sync {
    /// Return the tasks currently requested for `worker`, in delivery order
    async fn find_requested(&self, worker: &str) -> Result<Vec<T>, SourceError>;

    /// Acknowledge that `task` executed successfully
    async fn mark_completed(&self, task: &T) -> Result<(), SourceError>;

    /// Acknowledge `task` on behalf of the worker whose poll returned it
    async fn mark_completed_by(&self, worker: &str, task: &T) -> Result<(), SourceError>
    where
        T: Sync,
    {
        let _ = worker;
        self.mark_completed(task).await
    }
}

#[async_trait]
impl<T, S> TaskSource<T> for Arc<S>
where
    T: Send + Sync + 'static,
    S: TaskSource<T> + ?Sized,
{
    async fn find_requested(&self, worker: &str) -> Result<Vec<T>, SourceError> {
        (**self).find_requested(worker).await
    }

    async fn mark_completed(&self, task: &T) -> Result<(), SourceError> {
        (**self).mark_completed(task).await
    }

    async fn mark_completed_by(&self, worker: &str, task: &T) -> Result<(), SourceError>
    where
        T: Sync,
    {
        (**self).mark_completed_by(worker, task).await
    }
}
