//! Walk statistics with atomic counters.
//!
//! [`WalkStats`] is shared between the walkers of every crawl task through
//! an `Arc`; [`WalkSnapshot`] is the copyable view handed to reporting.
//!
//! All counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. The numbers are informational only.
//!
//! # Examples
//!
//! ```
//! use fc_walker::WalkStats;
//!
//! let stats = WalkStats::new();
//! stats.increment_surfaced();
//! stats.increment_pruned();
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.surfaced, 1);
//! assert_eq!(snapshot.pruned, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for walk progress.
#[derive(Debug, Default)]
pub struct WalkStats {
    /// Documents surfaced by walkers.
    surfaced: AtomicU64,
    /// Non-directory nodes rejected by the filter.
    filtered: AtomicU64,
    /// Directories expanded.
    directories: AtomicU64,
    /// Directories rejected by pattern (whole subtree skipped).
    pruned: AtomicU64,
    /// Directories whose children could not be listed.
    listing_errors: AtomicU64,
    /// Nodes skipped because their metadata or content could not be read.
    node_errors: AtomicU64,
}

impl WalkStats {
    /// Creates a new [`WalkStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the surfaced documents counter.
    #[inline]
    pub fn increment_surfaced(&self) {
        self.surfaced.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the filtered nodes counter.
    #[inline]
    pub fn increment_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the expanded directories counter.
    #[inline]
    pub fn increment_directories(&self) {
        self.directories.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the pruned directories counter.
    #[inline]
    pub fn increment_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the listing errors counter.
    #[inline]
    pub fn increment_listing_errors(&self) {
        self.listing_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the node errors counter.
    #[inline]
    pub fn increment_node_errors(&self) {
        self.node_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    ///
    /// Values are read one after another, so a snapshot taken during a walk
    /// may mix slightly different moments.
    #[must_use]
    pub fn snapshot(&self) -> WalkSnapshot {
        WalkSnapshot {
            surfaced: self.surfaced.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            directories: self.directories.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            listing_errors: self.listing_errors.load(Ordering::Relaxed),
            node_errors: self.node_errors.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.surfaced.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.directories.store(0, Ordering::Relaxed);
        self.pruned.store(0, Ordering::Relaxed);
        self.listing_errors.store(0, Ordering::Relaxed);
        self.node_errors.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of [`WalkStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalkSnapshot {
    /// Documents surfaced by walkers.
    pub surfaced: u64,
    /// Non-directory nodes rejected by the filter.
    pub filtered: u64,
    /// Directories expanded.
    pub directories: u64,
    /// Directories rejected by pattern.
    pub pruned: u64,
    /// Directories whose children could not be listed.
    pub listing_errors: u64,
    /// Nodes skipped after a metadata or content error.
    pub node_errors: u64,
}

impl WalkSnapshot {
    /// Total nodes the walkers looked at.
    ///
    /// # Examples
    ///
    /// ```
    /// use fc_walker::WalkSnapshot;
    ///
    /// let snap = WalkSnapshot {
    ///     surfaced: 5,
    ///     filtered: 3,
    ///     directories: 2,
    ///     pruned: 1,
    ///     listing_errors: 0,
    ///     node_errors: 1,
    /// };
    /// assert_eq!(snap.visited(), 12);
    /// ```
    #[inline]
    #[must_use]
    pub const fn visited(&self) -> u64 {
        self.surfaced + self.filtered + self.directories + self.pruned + self.node_errors
    }

    /// Total errors of either kind.
    #[inline]
    #[must_use]
    pub const fn errors(&self) -> u64 {
        self.listing_errors + self.node_errors
    }
}
