//! Bounded-concurrency task pool for one stage.

use std::future::Future;
use std::sync::Arc;

use bf_core::{Error, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome counts of one pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl PoolReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Runs one task per item with at most `max_concurrent` in flight.
///
/// Every task runs to completion; a failing or panicking task is counted
/// and does not cancel the others.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    max_concurrent: usize,
}

impl WorkerPool {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub async fn run<T, F, Fut>(&self, items: Vec<T>, task: F) -> PoolReport
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let task = Arc::new(task);
        let mut set = JoinSet::new();

        for item in items {
            let sem = Arc::clone(&semaphore);
            let task = Arc::clone(&task);
            set.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Internal(format!("worker semaphore closed: {e}")))?;
                task(item).await
            });
        }

        let mut report = PoolReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => report.succeeded += 1,
                Ok(Err(_)) => report.failed += 1,
                Err(e) => {
                    tracing::error!("Worker task aborted: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }
}
