//! Demo workload
//!
//! Tasks carry a simulated duration. Every seventh task fails on its first
//! attempt, so the log shows a failure followed by the retry once the
//! source's lease on it expires.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use drover_engine::{InMemoryTaskSource, TaskError, TaskExecutor};
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoTask {
    pub id: u64,
    pub work: Duration,
}

impl DemoTask {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            work: Duration::from_millis(50 * (id % 5 + 1)),
        }
    }
}

/// Queue `per_worker` tasks for each worker, numbering them globally
pub fn seed(source: &InMemoryTaskSource<DemoTask>, workers: &[String], per_worker: usize) {
    let mut next_id = 1;
    for worker in workers {
        for _ in 0..per_worker {
            source.push(worker, DemoTask::new(next_id));
            next_id += 1;
        }
    }
}

/// Executor that sleeps for the task's simulated duration
pub struct DemoExecutor {
    worker: String,
    attempted: Mutex<HashSet<u64>>,
}

impl DemoExecutor {
    pub fn new(worker: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            attempted: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl TaskExecutor<DemoTask> for DemoExecutor {
    async fn execute(&self, task: &DemoTask) -> Result<(), TaskError> {
        let first_attempt = self.attempted.lock().insert(task.id);

        tokio::time::sleep(task.work).await;

        if first_attempt && task.id % 7 == 0 {
            return Err(TaskError::failed(format!(
                "simulated failure on task {}",
                task.id
            )));
        }

        info!(
            worker = %self.worker,
            task_id = task.id,
            elapsed_ms = task.work.as_millis() as u64,
            "Demo task done"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_numbers_tasks_across_workers() {
        let source = InMemoryTaskSource::new();
        let workers = vec!["a".to_string(), "b".to_string()];

        seed(&source, &workers, 2);

        let ids = |w: &str| source.outstanding(w).iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids("a"), vec![1, 2]);
        assert_eq!(ids("b"), vec![3, 4]);
    }

    #[tokio::test]
    async fn test_seventh_task_fails_once() {
        let executor = DemoExecutor::new("a");
        let task = DemoTask::new(7);

        assert!(executor.execute(&task).await.is_err());
        assert!(executor.execute(&task).await.is_ok());
        assert!(executor.execute(&DemoTask::new(3)).await.is_ok());
    }
}
