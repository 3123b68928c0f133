//! One pass over one root.
//!
//! A [`CrawlTask`] owns the [`CrawlRecord`] of its root, so the record is
//! never touched by two threads at once. Each call to [`CrawlTask::run`]:
//!
//! 1. resolves the root (a missing root makes the pass a no-op)
//! 2. plans a full or incremental pass
//! 3. walks the tree and hands every document to the sink
//! 4. records the pass as complete if it was not aborted
//! 5. flushes the sink for the root, whatever happened before

use std::sync::Arc;
use std::time::SystemTime;

use fc_core::RootSpec;
use fc_walker::{FileFilter, FileSystemRegistry, TreeWalker, WalkStats};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentSink};
use crate::error::CrawlError;
use crate::record::{CrawlRecord, TraversalPolicy};

/// A repeatable crawl of one root.
#[derive(Debug)]
pub struct CrawlTask {
    root: RootSpec,
    registry: Arc<FileSystemRegistry>,
    sink: Arc<dyn DocumentSink>,
    filter: Arc<FileFilter>,
    policy: TraversalPolicy,
    record: CrawlRecord,
    stats: Arc<WalkStats>,
}

impl CrawlTask {
    /// Creates a task with a fresh record and the default traversal policy.
    #[must_use]
    pub fn new(
        root: RootSpec,
        registry: Arc<FileSystemRegistry>,
        sink: Arc<dyn DocumentSink>,
        filter: Arc<FileFilter>,
    ) -> Self {
        Self {
            root,
            registry,
            sink,
            filter,
            policy: TraversalPolicy::default(),
            record: CrawlRecord::new(),
            stats: Arc::new(WalkStats::new()),
        }
    }

    /// Sets the full-versus-incremental policy.
    #[must_use]
    pub fn with_policy(mut self, policy: TraversalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Starts from an existing record.
    #[must_use]
    pub fn with_record(mut self, record: CrawlRecord) -> Self {
        self.record = record;
        self
    }

    /// Records walk progress into shared counters.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<WalkStats>) -> Self {
        self.stats = stats;
        self
    }

    /// The root this task crawls.
    #[must_use]
    pub fn root(&self) -> &RootSpec {
        &self.root
    }

    /// The traversal history of the root.
    #[must_use]
    pub fn record(&self) -> &CrawlRecord {
        &self.record
    }

    /// Walk counters, cumulative across passes.
    #[must_use]
    pub fn stats(&self) -> &Arc<WalkStats> {
        &self.stats
    }

    /// Runs one pass starting now.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Sink`] on a fatal sink failure,
    /// [`CrawlError::Repository`] if the root exists but cannot be resolved,
    /// and [`CrawlError::Cancelled`] if `cancel` fired during the walk.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<(), CrawlError> {
        self.run_at(SystemTime::now(), cancel)
    }

    /// Runs one pass as if it started at `start`.
    ///
    /// # Errors
    ///
    /// See [`CrawlTask::run`].
    pub fn run_at(&mut self, start: SystemTime, cancel: &CancellationToken) -> Result<(), CrawlError> {
        let outcome = self.pass(start, cancel);
        let flushed = self.sink.flush(self.root.path());

        match (outcome, flushed) {
            (Err(e), flushed) => {
                if let Err(flush_error) = flushed {
                    warn!(root = %self.root, error = %flush_error, "Flush failed after aborted pass");
                }
                Err(e)
            }
            (Ok(()), Err(e)) if e.is_recoverable() => {
                warn!(root = %self.root, error = %e, "Flush reported a rejected document");
                Ok(())
            }
            (Ok(()), Err(e)) => Err(e.into()),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn pass(&mut self, start: SystemTime, cancel: &CancellationToken) -> Result<(), CrawlError> {
        let node = match self.registry.resolve(&self.root) {
            Ok(node) => node,
            Err(e) if e.is_missing() => {
                info!(root = %self.root, reason = %e, "Root unavailable, skipping pass");
                return Ok(());
            }
            Err(e) => return Err(CrawlError::repository(self.root.path(), e)),
        };

        let mode = self.record.plan_pass(start, &self.policy);
        info!(root = %self.root, mode = mode.label(), "Starting pass");

        let filter = match mode.modified_since() {
            Some(since) => Arc::new(self.filter.as_ref().clone().with_modified_since(Some(since))),
            None => Arc::clone(&self.filter),
        };
        let mut walker = TreeWalker::new(node, filter)
            .with_cancellation(cancel.clone())
            .with_stats(Arc::clone(&self.stats));

        let mut accepted = 0_u64;
        let mut rejected = 0_u64;
        while walker.has_more() {
            let Some(item) = walker.take_next() else {
                break;
            };
            let document = match Document::materialize(&self.root, item, mode) {
                Ok(document) => document,
                Err(e) => {
                    warn!(root = %self.root, error = %e, "Skipping document");
                    self.stats.increment_node_errors();
                    continue;
                }
            };
            match self.sink.accept(document) {
                Ok(()) => accepted += 1,
                Err(e) if e.is_recoverable() => {
                    warn!(root = %self.root, error = %e, "Document rejected");
                    rejected += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if walker.is_cancelled() {
            info!(root = %self.root, accepted, "Pass cancelled");
            return Err(CrawlError::Cancelled);
        }

        self.record.complete_pass(start, mode);
        info!(root = %self.root, mode = mode.label(), accepted, rejected, "Finished pass");
        debug!(root = %self.root, stats = ?self.stats.snapshot(), "Walk statistics");
        Ok(())
    }
}
