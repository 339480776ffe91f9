//! In-memory implementation of TaskSource for testing

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use super::store::TaskSource;
use crate::error::SourceError;

/// In-memory implementation of [`TaskSource`]
///
/// Tasks are queued per worker name and stay queued until acknowledged.
///
/// Without a lease, polling returns a snapshot and leaves the tasks visible,
/// so a task that runs longer than the poll interval is submitted again on
/// every tick and each duplicate's acknowledgment fails. Set a lease with
/// [`with_lease`](Self::with_lease) to hide a delivered task until it is
/// acknowledged or the lease runs out; a task whose execution failed is
/// offered again once its lease expires.
///
/// Acknowledgment through [`TaskSource::mark_completed_by`] only touches the
/// acknowledging worker's queue. Plain [`TaskSource::mark_completed`] only
/// removes a task that some poll has already delivered.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use drover_engine::InMemoryTaskSource;
///
/// let source = InMemoryTaskSource::new().with_lease(Duration::from_secs(30));
/// source.push("billing", 42u32);
/// assert_eq!(source.outstanding("billing"), vec![42]);
/// ```
pub struct InMemoryTaskSource<T> {
    queues: RwLock<BTreeMap<String, Vec<Entry<T>>>>,
    completed: RwLock<Vec<T>>,
    lease: Option<Duration>,
    polls: AtomicU64,
}

struct Entry<T> {
    task: T,
    delivered: bool,
    leased_until: Option<Instant>,
}

impl<T> Entry<T> {
    fn new(task: T) -> Self {
        Self {
            task,
            delivered: false,
            leased_until: None,
        }
    }

    fn visible_at(&self, now: Instant) -> bool {
        self.leased_until.map_or(true, |until| until <= now)
    }
}

impl<T: Clone + PartialEq> InMemoryTaskSource<T> {
    /// Create an empty source without leases
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(BTreeMap::new()),
            completed: RwLock::new(Vec::new()),
            lease: None,
            polls: AtomicU64::new(0),
        }
    }

    /// Hide each delivered task from further polls for `lease`
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Queue a task for `worker`
    pub fn push(&self, worker: &str, task: T) {
        self.queues
            .write()
            .entry(worker.to_string())
            .or_default()
            .push(Entry::new(task));
    }

    /// Queue several tasks for `worker`, preserving order
    pub fn extend(&self, worker: &str, tasks: impl IntoIterator<Item = T>) {
        self.queues
            .write()
            .entry(worker.to_string())
            .or_default()
            .extend(tasks.into_iter().map(Entry::new));
    }

    /// Tasks not yet acknowledged for `worker`, leased or not
    pub fn outstanding(&self, worker: &str) -> Vec<T> {
        self.queues
            .read()
            .get(worker)
            .map(|queue| queue.iter().map(|e| e.task.clone()).collect())
            .unwrap_or_default()
    }

    /// Total number of outstanding tasks across all workers
    pub fn outstanding_count(&self) -> usize {
        self.queues.read().values().map(Vec::len).sum()
    }

    /// Tasks acknowledged so far, in acknowledgment order
    pub fn completed(&self) -> Vec<T> {
        self.completed.read().clone()
    }

    /// Number of acknowledged tasks
    pub fn completed_count(&self) -> usize {
        self.completed.read().len()
    }

    /// Number of `find_requested` calls served
    pub fn poll_count(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    fn complete(&self, task: Option<T>) -> Result<(), SourceError> {
        match task {
            Some(task) => {
                self.completed.write().push(task);
                Ok(())
            }
            None => Err(SourceError::Rejected(
                "task is not outstanding".to_string(),
            )),
        }
    }
}

impl<T: Clone + PartialEq> Default for InMemoryTaskSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove the first entry equal to `task`, preferring delivered ones
fn take<T: PartialEq>(queue: &mut Vec<Entry<T>>, task: &T, delivered_only: bool) -> Option<T> {
    let idx = queue
        .iter()
        .position(|e| e.delivered && e.task == *task)
        .or_else(|| {
            if delivered_only {
                None
            } else {
                queue.iter().position(|e| e.task == *task)
            }
        })?;
    Some(queue.remove(idx).task)
}

#[async_trait]
impl<T> TaskSource<T> for InMemoryTaskSource<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    async fn find_requested(&self, worker: &str) -> Result<Vec<T>, SourceError> {
        self.polls.fetch_add(1, Ordering::Relaxed);

        let now = Instant::now();
        let mut queues = self.queues.write();
        let Some(queue) = queues.get_mut(worker) else {
            return Ok(Vec::new());
        };

        let mut tasks = Vec::new();
        for entry in queue.iter_mut().filter(|e| e.visible_at(now)) {
            entry.delivered = true;
            entry.leased_until = self.lease.map(|lease| now + lease);
            tasks.push(entry.task.clone());
        }
        Ok(tasks)
    }

    async fn mark_completed(&self, task: &T) -> Result<(), SourceError> {
        let removed = self
            .queues
            .write()
            .values_mut()
            .find_map(|queue| take(queue, task, true));
        self.complete(removed)
    }

    async fn mark_completed_by(&self, worker: &str, task: &T) -> Result<(), SourceError>
    where
        T: Sync,
    {
        let removed = self
            .queues
            .write()
            .get_mut(worker)
            .and_then(|queue| take(queue, task, false));
        self.complete(removed)
    }
}
