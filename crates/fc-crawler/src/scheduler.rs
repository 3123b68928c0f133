//! The crawl scheduler state machine.
//!
//! # States
//!
//! ```text
//!          start()
//!   Idle ──────────► Sleeping ◄──────────────┐
//!                      │  due                │ post-run pause
//!                      ▼                     │
//!                    Running ────────────────┘
//!
//!   any ── shutdown() ──► ShuttingDown ──► Stopped
//! ```
//!
//! One control thread (the caller of [`CrawlScheduler::start`]) runs the tick
//! loop: sleep until the schedule is due, run one [`CrawlTask`] per root on
//! the [`WorkerPool`], wait for all of them, then sleep for the retry delay
//! (or the error delay if any task failed).
//!
//! Other threads talk to the loop only through [`CrawlScheduler::shutdown`]
//! and [`CrawlScheduler::set_schedule`], both of which raise a
//! [`WakeReason`] on the scheduler's [`WakeSignal`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::thread;
//! use fc_core::RootSpecs;
//! use fc_crawler::{CrawlScheduler, JsonLinesSink};
//!
//! let roots = RootSpecs::from_paths(&["/srv/docs", "/mnt/share"])?;
//! let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
//! let scheduler = Arc::new(CrawlScheduler::builder(roots, sink).thread_count(4).build());
//!
//! let control = {
//!     let scheduler = Arc::clone(&scheduler);
//!     thread::spawn(move || scheduler.start())
//! };
//! // ... later, from any thread:
//! scheduler.shutdown();
//! control.join().map_err(|_| "control thread panicked")??;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use fc_core::RootSpecs;
use fc_core::config::{DEFAULT_ERROR_DELAY_SECS, DEFAULT_THREAD_COUNT};
use fc_walker::{FileFilter, FileSystemRegistry, WalkSnapshot, WalkStats};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::DocumentSink;
use crate::error::CrawlError;
use crate::pool::{BatchOutcome, WorkerPool};
use crate::record::TraversalPolicy;
use crate::schedule::{Pause, Schedule, WindowedSchedule};
use crate::signal::{WakeReason, WakeSignal};
use crate::task::CrawlTask;

/// Lifecycle state of a [`CrawlScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Constructed, not started.
    Idle,
    /// Waiting for the next tick or a wake-up.
    Sleeping,
    /// Running a batch.
    Running,
    /// Shutdown requested; draining.
    ShuttingDown,
    /// Terminated.
    Stopped,
}

impl SchedulerState {
    /// Returns `true` for the two terminal states.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ShuttingDown | Self::Stopped)
    }
}

/// Point-in-time view of a scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Current state.
    pub state: SchedulerState,
    /// Batches started since construction.
    pub batches_started: u64,
    /// Batches in which at least one task failed.
    pub batches_failed: u64,
    /// The most recent pause the control thread chose.
    pub last_pause: Option<Pause>,
    /// Walk counters summed over every root.
    pub walk: WalkSnapshot,
}

#[derive(Debug, Default)]
struct Counters {
    batches_started: u64,
    batches_failed: u64,
    last_pause: Option<Pause>,
}

/// Runs one crawl task per root on a recurring schedule.
#[derive(Debug)]
pub struct CrawlScheduler {
    tasks: Vec<Mutex<CrawlTask>>,
    sink: Arc<dyn DocumentSink>,
    thread_count: usize,
    error_delay: Duration,
    schedule: Mutex<Arc<dyn Schedule>>,
    pool: Mutex<Option<Arc<WorkerPool>>>,
    wake: WakeSignal,
    state: Mutex<SchedulerState>,
    counters: Mutex<Counters>,
    stats: Arc<WalkStats>,
}

impl CrawlScheduler {
    /// Starts building a scheduler over `roots` feeding `sink`.
    pub fn builder(roots: RootSpecs, sink: Arc<dyn DocumentSink>) -> CrawlSchedulerBuilder {
        CrawlSchedulerBuilder::new(roots, sink)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Number of roots, and so of tasks per batch.
    #[must_use]
    pub fn root_count(&self) -> usize {
        self.tasks.len()
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        let counters = self.counters.lock();
        SchedulerStatus {
            state: self.state(),
            batches_started: counters.batches_started,
            batches_failed: counters.batches_failed,
            last_pause: counters.last_pause,
            walk: self.stats.snapshot(),
        }
    }

    /// Replaces the active schedule and wakes a sleeping control thread.
    pub fn set_schedule(&self, schedule: Arc<dyn Schedule>) {
        debug!(schedule = ?schedule, "Replacing schedule");
        *self.schedule.lock() = schedule;
        self.wake.notify(WakeReason::ScheduleChanged);
    }

    /// Requests termination. Safe to call any number of times, from any
    /// thread, before or during [`start`](Self::start).
    pub fn shutdown(&self) {
        let first = !self.wake.is_shutdown();
        self.wake.notify(WakeReason::Shutdown);
        {
            let mut state = self.state.lock();
            if matches!(*state, SchedulerState::Sleeping | SchedulerState::Running) {
                *state = SchedulerState::ShuttingDown;
            }
        }
        if let Some(pool) = self.pool.lock().as_ref() {
            pool.cancel();
        }
        if first {
            info!("Shutdown requested");
        }
    }

    /// Runs the tick loop on the calling thread until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::AlreadyStarted`] if the scheduler is not idle
    /// and [`CrawlError::PoolBuild`] if a worker pool cannot be built.
    /// Task failures never end the loop.
    pub fn start(&self) -> Result<(), CrawlError> {
        self.begin()?;
        info!(
            roots = self.tasks.len(),
            threads = self.thread_count,
            "Starting crawl scheduler"
        );
        let result = self.tick_loop();
        self.finish();
        result
    }

    /// Waits for the schedule to be due, runs a single batch, and stops.
    ///
    /// Returns `None` if shutdown arrived before the batch started.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn run_once(&self) -> Result<Option<BatchOutcome>, CrawlError> {
        self.begin()?;
        let result = self.single_tick();
        self.finish();
        result
    }

    fn begin(&self) -> Result<(), CrawlError> {
        let mut state = self.state.lock();
        if *state != SchedulerState::Idle {
            return Err(CrawlError::AlreadyStarted);
        }
        *state = SchedulerState::Sleeping;
        Ok(())
    }

    fn tick_loop(&self) -> Result<(), CrawlError> {
        self.install_pool()?;

        loop {
            match self.sleep(Pause::until_due(self.schedule().as_ref())) {
                Some(WakeReason::Shutdown) => break,
                Some(WakeReason::ScheduleChanged) => {
                    info!("Schedule changed, restarting worker pool");
                    self.install_pool()?;
                    continue;
                }
                None => {}
            }
            if self.wake.is_shutdown() {
                break;
            }

            let outcome = self.run_batch()?;
            let woke = if outcome.has_failures() {
                warn!(
                    failed = outcome.failed,
                    delay_secs = self.error_delay.as_secs(),
                    "Batch had failures, backing off"
                );
                self.back_off()
            } else {
                self.sleep(Pause::after_success(self.schedule().as_ref()))
            };

            match woke {
                Some(WakeReason::Shutdown) => break,
                Some(WakeReason::ScheduleChanged) => {
                    info!("Schedule changed after batch, restarting worker pool");
                    self.install_pool()?;
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Sleeps out the whole error delay. Only shutdown ends it early; a
    /// schedule change is reported once the delay has elapsed.
    fn back_off(&self) -> Option<WakeReason> {
        let deadline = Instant::now().checked_add(self.error_delay);
        let mut pause = Pause::For(self.error_delay);
        let mut changed = false;

        loop {
            match self.sleep(pause) {
                Some(WakeReason::Shutdown) => return Some(WakeReason::Shutdown),
                Some(WakeReason::ScheduleChanged) => {
                    debug!("Schedule changed during error delay");
                    changed = true;
                    let remaining = deadline.map_or(self.error_delay, |deadline| {
                        deadline.saturating_duration_since(Instant::now())
                    });
                    if remaining.is_zero() {
                        break;
                    }
                    pause = Pause::For(remaining);
                }
                None => break,
            }
        }
        changed.then_some(WakeReason::ScheduleChanged)
    }

    fn single_tick(&self) -> Result<Option<BatchOutcome>, CrawlError> {
        self.install_pool()?;

        loop {
            match self.sleep(Pause::until_due(self.schedule().as_ref())) {
                Some(WakeReason::Shutdown) => return Ok(None),
                Some(WakeReason::ScheduleChanged) => continue,
                None if self.wake.is_shutdown() => return Ok(None),
                None => break,
            }
        }
        self.run_batch().map(Some)
    }

    fn sleep(&self, pause: Pause) -> Option<WakeReason> {
        self.set_state(SchedulerState::Sleeping);
        self.counters.lock().last_pause = Some(pause);
        debug!(pause = %pause, "Sleeping");
        self.wake.wait(pause)
    }

    fn run_batch(&self) -> Result<BatchOutcome, CrawlError> {
        let pool = match self.current_pool() {
            Some(pool) => pool,
            None => self.install_pool()?,
        };

        self.set_state(SchedulerState::Running);
        self.counters.lock().batches_started += 1;
        info!(roots = self.tasks.len(), "Starting batch");

        let outcome = pool.run_batch(&self.tasks);

        if outcome.has_failures() {
            self.counters.lock().batches_failed += 1;
        }
        info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            cancelled = outcome.cancelled,
            "Batch finished"
        );
        Ok(outcome)
    }

    /// Swaps in a fresh pool, cancelling the previous one.
    fn install_pool(&self) -> Result<Arc<WorkerPool>, CrawlError> {
        let pool = Arc::new(WorkerPool::new(self.thread_count)?);
        let previous = self.pool.lock().replace(Arc::clone(&pool));
        if let Some(previous) = previous {
            previous.cancel();
        }
        if self.wake.is_shutdown() {
            pool.cancel();
        }
        Ok(pool)
    }

    fn current_pool(&self) -> Option<Arc<WorkerPool>> {
        self.pool.lock().as_ref().map(Arc::clone)
    }

    fn schedule(&self) -> Arc<dyn Schedule> {
        Arc::clone(&self.schedule.lock())
    }

    fn set_state(&self, next: SchedulerState) {
        let mut state = self.state.lock();
        if !state.is_terminal() {
            *state = next;
        }
    }

    fn finish(&self) {
        *self.state.lock() = SchedulerState::ShuttingDown;
        if let Some(pool) = self.pool.lock().take() {
            pool.cancel();
        }
        self.sink.cancel();
        *self.state.lock() = SchedulerState::Stopped;
        info!("Crawl scheduler stopped");
    }
}

/// Builder for [`CrawlScheduler`].
#[derive(Debug)]
pub struct CrawlSchedulerBuilder {
    roots: RootSpecs,
    sink: Arc<dyn DocumentSink>,
    registry: Arc<FileSystemRegistry>,
    filter: Arc<FileFilter>,
    policy: TraversalPolicy,
    schedule: Arc<dyn Schedule>,
    thread_count: usize,
    error_delay: Duration,
}

impl CrawlSchedulerBuilder {
    fn new(roots: RootSpecs, sink: Arc<dyn DocumentSink>) -> Self {
        Self {
            roots,
            sink,
            registry: Arc::new(FileSystemRegistry::default()),
            filter: Arc::new(FileFilter::default()),
            policy: TraversalPolicy::default(),
            schedule: Arc::new(WindowedSchedule::new(900)),
            thread_count: DEFAULT_THREAD_COUNT,
            error_delay: Duration::from_secs(DEFAULT_ERROR_DELAY_SECS),
        }
    }

    /// Filesystem types used to resolve roots.
    #[must_use]
    pub fn registry(mut self, registry: Arc<FileSystemRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Filter applied by every walker.
    #[must_use]
    pub fn filter(mut self, filter: Arc<FileFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Full-versus-incremental policy for every root.
    #[must_use]
    pub fn policy(mut self, policy: TraversalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Initial schedule.
    #[must_use]
    pub fn schedule(mut self, schedule: Arc<dyn Schedule>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Upper bound on concurrently crawled roots (at least 1).
    #[must_use]
    pub fn thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count.max(1);
        self
    }

    /// Pause after a batch with failures.
    #[must_use]
    pub fn error_delay(mut self, error_delay: Duration) -> Self {
        self.error_delay = error_delay;
        self
    }

    /// Builds the scheduler, tagging each root with its filesystem type.
    #[must_use]
    pub fn build(self) -> CrawlScheduler {
        let stats = Arc::new(WalkStats::new());
        let tasks = self
            .registry
            .identify(self.roots)
            .into_iter()
            .map(|root| {
                Mutex::new(
                    CrawlTask::new(
                        root,
                        Arc::clone(&self.registry),
                        Arc::clone(&self.sink),
                        Arc::clone(&self.filter),
                    )
                    .with_policy(self.policy)
                    .with_stats(Arc::clone(&stats)),
                )
            })
            .collect();

        CrawlScheduler {
            tasks,
            sink: self.sink,
            thread_count: self.thread_count,
            error_delay: self.error_delay,
            schedule: Mutex::new(self.schedule),
            pool: Mutex::new(None),
            wake: WakeSignal::new(),
            state: Mutex::new(SchedulerState::Idle),
            counters: Mutex::new(Counters::default()),
            stats,
        }
    }
}
