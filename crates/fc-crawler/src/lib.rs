//! Multi-root crawl scheduling for the fscrawl file repository crawler.
//!
//! # Overview
//!
//! - [`CrawlScheduler`]: the tick loop and its lifecycle state machine
//! - [`CrawlTask`]: one pass over one root, full or incremental
//! - [`CrawlRecord`]: per-root traversal history driving that decision
//! - [`WorkerPool`]: bounded `rayon` pool running one batch per tick
//! - [`WakeSignal`]: typed wake-ups for the sleeping control thread
//! - [`Schedule`] / [`WindowedSchedule`]: when ticks are due
//! - [`DocumentSink`] / [`JsonLinesSink`]: where documents go
//!
//! # Architecture
//!
//! ```text
//! control thread                         worker pool (rayon)
//! ──────────────                         ───────────────────
//! CrawlScheduler::start
//!   ├── WakeSignal::wait(until due)
//!   ├── WorkerPool::run_batch ─────────► CrawlTask::run  (one per root)
//!   │                                      ├── FileSystemRegistry::resolve
//!   │                                      ├── CrawlRecord::plan_pass
//!   │                                      ├── TreeWalker ─► DocumentSink::accept
//!   │                                      └── DocumentSink::flush
//!   └── WakeSignal::wait(retry or error delay)
//! ```
//!
//! # Failure Policy
//!
//! Per-node and per-document failures stay inside a task. A fatal sink
//! error or repository failure ends that root's pass and marks the batch as
//! failed, which makes the whole next tick wait for the error delay.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod pool;
pub mod record;
pub mod schedule;
pub mod scheduler;
pub mod signal;
pub mod task;

pub use document::{Document, DocumentSink, JsonLinesSink};
pub use error::{CrawlError, SinkError};
pub use pool::{BatchOutcome, WorkerPool};
pub use record::{CrawlMode, CrawlRecord, TraversalPolicy};
pub use schedule::{Pause, Schedule, WindowedSchedule};
pub use scheduler::{CrawlScheduler, CrawlSchedulerBuilder, SchedulerState, SchedulerStatus};
pub use signal::{WakeReason, WakeSignal};
pub use task::CrawlTask;
