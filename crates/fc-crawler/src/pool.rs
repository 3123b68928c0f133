//! Bounded worker pool running one batch of crawl tasks at a time.

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::CrawlError;
use crate::task::CrawlTask;

/// Per-batch tally of task outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Tasks whose pass completed.
    pub succeeded: usize,
    /// Tasks whose pass failed.
    pub failed: usize,
    /// Tasks that were cancelled or never started.
    pub cancelled: usize,
}

impl BatchOutcome {
    /// Returns `true` if any task failed. Cancellation is not a failure.
    #[inline]
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// A `rayon` thread pool sized to the configured concurrency, plus the
/// token that cancels whatever it is running.
///
/// A cancelled pool stays cancelled; the scheduler replaces it with a new
/// one instead of reusing it.
#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Builds a pool with `threads` workers.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::PoolBuild`] if the threads cannot be spawned.
    pub fn new(threads: usize) -> Result<Self, CrawlError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("fc-crawl-{index}"))
            .build()?;
        Ok(Self {
            pool,
            cancel: CancellationToken::new(),
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Interrupts running tasks and stops queued ones from starting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the pool has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs every task once and waits for all of them.
    ///
    /// Tasks beyond the pool size queue until a worker is free.
    pub fn run_batch(&self, tasks: &[Mutex<CrawlTask>]) -> BatchOutcome {
        let outcome = Mutex::new(BatchOutcome::default());

        self.pool.scope(|scope| {
            for task in tasks {
                let cancel = &self.cancel;
                let outcome = &outcome;
                scope.spawn(move |_| {
                    if cancel.is_cancelled() {
                        outcome.lock().cancelled += 1;
                        return;
                    }
                    let mut task = task.lock();
                    let result = task.run(cancel);
                    let mut outcome = outcome.lock();
                    match result {
                        Ok(()) => outcome.succeeded += 1,
                        Err(e) if e.is_cancelled() => outcome.cancelled += 1,
                        Err(e) => {
                            warn!(root = %task.root(), error = %e, "Crawl task failed");
                            outcome.failed += 1;
                        }
                    }
                });
            }
        });

        outcome.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentSink;
    use crate::error::SinkError;
    use crate::task::tests::RecordingSink;
    use fc_core::RootSpec;
    use fc_walker::{FileFilter, FileSystemRegistry};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn tasks(roots: &[&TempDir], sink: &Arc<RecordingSink>) -> Vec<Mutex<CrawlTask>> {
        let registry = Arc::new(FileSystemRegistry::default());
        let filter = Arc::new(FileFilter::default());
        roots
            .iter()
            .map(|temp| {
                let root = RootSpec::new(temp.path().to_str().unwrap()).unwrap();
                let sink = Arc::clone(sink) as Arc<dyn DocumentSink>;
                Mutex::new(CrawlTask::new(
                    root,
                    Arc::clone(&registry),
                    sink,
                    Arc::clone(&filter),
                ))
            })
            .collect()
    }

    fn temp_with(names: &[&str]) -> TempDir {
        let temp = TempDir::new().unwrap();
        for name in names {
            fs::write(temp.path().join(name), name).unwrap();
        }
        temp
    }

    #[test]
    fn test_batch_runs_every_task() {
        let (a, b, c) = (temp_with(&["1", "2"]), temp_with(&["3"]), temp_with(&[]));
        let sink = Arc::new(RecordingSink::default());
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.threads(), 2);

        let outcome = pool.run_batch(&tasks(&[&a, &b, &c], &sink));

        assert_eq!(
            outcome,
            BatchOutcome {
                succeeded: 3,
                failed: 0,
                cancelled: 0
            }
        );
        assert_eq!(sink.paths().len(), 3);
        assert_eq!(sink.flushes.lock().len(), 3);
    }

    #[test]
    fn test_failure_is_counted() {
        let (a, b) = (temp_with(&["bad"]), temp_with(&["good"]));
        let sink = Arc::new(RecordingSink::failing_on("/bad", SinkError::fatal("x")));
        let pool = WorkerPool::new(4).unwrap();

        let outcome = pool.run_batch(&tasks(&[&a, &b], &sink));

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 1);
        assert!(outcome.has_failures());
    }

    #[test]
    fn test_cancelled_pool_starts_nothing() {
        let a = temp_with(&["1"]);
        let sink = Arc::new(RecordingSink::default());
        let pool = WorkerPool::new(1).unwrap();
        pool.cancel();
        assert!(pool.is_cancelled());

        let outcome = pool.run_batch(&tasks(&[&a], &sink));

        assert_eq!(outcome.cancelled, 1);
        assert!(!outcome.has_failures());
        assert!(sink.paths().is_empty());
    }
}
