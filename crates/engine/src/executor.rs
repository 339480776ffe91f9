//! Task executors and workers

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// Performs the side effect of a single task
///
/// Return `Err` for failures; the engine records them and leaves the task
/// unacknowledged. Panics are caught at the call site and reported as
/// [`TaskError::Panicked`], but an explicit error is always preferred.
///
/// # Example
///
/// ```ignore
/// struct ChargeCard { client: PaymentsClient }
///
/// #[async_trait]
/// impl TaskExecutor<Charge> for ChargeCard {
///     async fn execute(&self, charge: &Charge) -> Result<(), TaskError> {
///         self.client.charge(charge.card, charge.amount).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor<T>: Send + Sync {
    /// Execute one task
    async fn execute(&self, task: &T) -> Result<(), TaskError>;
}

#[async_trait]
impl<T, E> TaskExecutor<T> for Arc<E>
where
    T: Send + Sync + 'static,
    E: TaskExecutor<T> + ?Sized,
{
    async fn execute(&self, task: &T) -> Result<(), TaskError> {
        (**self).execute(task).await
    }
}

/// Executor backed by a closure
///
/// Created with [`executor_fn`].
pub struct FnExecutor<T, F> {
    f: F,
    _task: PhantomData<fn(&T)>,
}

/// Build a [`TaskExecutor`] from a closure
///
/// The closure borrows the task, so it should copy out whatever the returned
/// future needs.
///
/// ```
/// use drover_engine::{executor_fn, TaskError};
///
/// let executor = executor_fn(|order_id: &u64| {
///     let order_id = *order_id;
///     async move {
///         if order_id == 0 {
///             return Err(TaskError::failed("order id must be non-zero"));
///         }
///         Ok(())
///     }
/// });
/// # let _ = executor;
/// ```
pub fn executor_fn<T, F, Fut>(f: F) -> FnExecutor<T, F>
where
    F: Fn(&T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    FnExecutor {
        f,
        _task: PhantomData,
    }
}

#[async_trait]
impl<T, F, Fut> TaskExecutor<T> for FnExecutor<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn execute(&self, task: &T) -> Result<(), TaskError> {
        (self.f)(task).await
    }
}

/// A named worker and the executor that runs its tasks
///
/// The name is what the engine passes to
/// [`TaskSource::find_requested`](crate::source::TaskSource::find_requested).
pub struct Worker<T> {
    name: String,
    executor: Arc<dyn TaskExecutor<T>>,
}

impl<T: 'static> Worker<T> {
    /// Create a worker
    pub fn new(name: impl Into<String>, executor: impl TaskExecutor<T> + 'static) -> Self {
        Self {
            name: name.into(),
            executor: Arc::new(executor),
        }
    }

    /// Create a worker from an already shared executor
    pub fn with_shared(name: impl Into<String>, executor: Arc<dyn TaskExecutor<T>>) -> Self {
        Self {
            name: name.into(),
            executor,
        }
    }
}

impl<T> Worker<T> {
    /// Worker name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn executor(&self) -> Arc<dyn TaskExecutor<T>> {
        Arc::clone(&self.executor)
    }
}

impl<T> Clone for Worker<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<T> fmt::Debug for Worker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker").field("name", &self.name).finish()
    }
}
