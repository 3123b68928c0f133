//! Per-root traversal bookkeeping and the full-versus-incremental decision.
//!
//! A [`CrawlRecord`] remembers when its root was last traversed, fully and
//! at all. Before each pass, [`CrawlRecord::plan_pass`] turns that history
//! and the [`TraversalPolicy`] into a [`CrawlMode`]:
//!
//! ```text
//! interval set and start - last_full >= interval  → Full (last_full reset)
//! otherwise                                       → Incremental { since:
//!                                                     max(epoch, last - cushion) }
//! ```
//!
//! Timestamps use [`UNIX_EPOCH`] to mean "never". Records live only in
//! memory; a restarted crawler begins with a full pass.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fc_core::CrawlConfig;
use serde::Serialize;

/// How a pass decides between full and incremental traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalPolicy {
    /// Interval after which a full pass is forced; `None` never forces one.
    pub full_traversal_interval: Option<Duration>,
    /// Margin subtracted from the last traversal time to absorb clock skew.
    pub cushion: Duration,
}

impl TraversalPolicy {
    /// Builds the policy from crawl configuration.
    #[must_use]
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            full_traversal_interval: config.full_traversal_interval(),
            cushion: config.cushion(),
        }
    }
}

impl Default for TraversalPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlConfig::default())
    }
}

/// The kind of pass a crawl task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum CrawlMode {
    /// Every qualifying node is surfaced.
    Full,
    /// Only nodes modified at or after `since` are surfaced.
    Incremental {
        /// Modification-time threshold.
        since: SystemTime,
    },
}

impl CrawlMode {
    /// The modification-time threshold; the epoch for full passes.
    #[must_use]
    pub const fn threshold(&self) -> SystemTime {
        match self {
            Self::Full => UNIX_EPOCH,
            Self::Incremental { since } => *since,
        }
    }

    /// The threshold to hand the walker, if the pass filters by time at all.
    #[must_use]
    pub const fn modified_since(&self) -> Option<SystemTime> {
        match self {
            Self::Full => None,
            Self::Incremental { since } => Some(*since),
        }
    }

    /// Short label for logs and documents.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental { .. } => "incremental",
        }
    }

    /// Returns `true` for full passes.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Traversal history of one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlRecord {
    last_full_traversal: SystemTime,
    last_traversal: SystemTime,
}

impl Default for CrawlRecord {
    fn default() -> Self {
        Self {
            last_full_traversal: UNIX_EPOCH,
            last_traversal: UNIX_EPOCH,
        }
    }
}

impl CrawlRecord {
    /// A record for a root that has never been traversed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A record with explicit history.
    #[must_use]
    pub const fn with_history(last_full_traversal: SystemTime, last_traversal: SystemTime) -> Self {
        Self {
            last_full_traversal,
            last_traversal,
        }
    }

    /// Start time of the last completed full pass.
    #[must_use]
    pub const fn last_full_traversal(&self) -> SystemTime {
        self.last_full_traversal
    }

    /// Start time of the last completed pass of either kind.
    #[must_use]
    pub const fn last_traversal(&self) -> SystemTime {
        self.last_traversal
    }

    /// Decides the mode of a pass starting at `start`.
    ///
    /// A forced full pass resets the last full traversal to the epoch, so a
    /// full pass that never completes is retried on the next pass.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, UNIX_EPOCH};
    /// use fc_crawler::{CrawlMode, CrawlRecord, TraversalPolicy};
    ///
    /// let policy = TraversalPolicy {
    ///     full_traversal_interval: None,
    ///     cushion: Duration::from_secs(60),
    /// };
    /// let last = UNIX_EPOCH + Duration::from_secs(1_000);
    /// let mut record = CrawlRecord::with_history(last, last);
    ///
    /// let mode = record.plan_pass(last + Duration::from_secs(10), &policy);
    /// assert_eq!(mode, CrawlMode::Incremental { since: UNIX_EPOCH + Duration::from_secs(940) });
    /// ```
    pub fn plan_pass(&mut self, start: SystemTime, policy: &TraversalPolicy) -> CrawlMode {
        if let Some(interval) = policy.full_traversal_interval {
            let elapsed = start
                .duration_since(self.last_full_traversal)
                .unwrap_or(Duration::ZERO);
            if elapsed >= interval {
                self.last_full_traversal = UNIX_EPOCH;
                return CrawlMode::Full;
            }
        }

        let since = self
            .last_traversal
            .checked_sub(policy.cushion)
            .map_or(UNIX_EPOCH, |t| t.max(UNIX_EPOCH));
        CrawlMode::Incremental { since }
    }

    /// Records a completed pass that started at `start`.
    pub fn complete_pass(&mut self, start: SystemTime, mode: CrawlMode) {
        self.last_traversal = start;
        if mode.is_full() {
            self.last_full_traversal = start;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn policy(interval: Option<u64>, cushion: u64) -> TraversalPolicy {
        TraversalPolicy {
            full_traversal_interval: interval.map(Duration::from_secs),
            cushion: Duration::from_secs(cushion),
        }
    }

    #[test]
    fn test_zero_interval_always_full() {
        let policy = policy(Some(0), 60);
        let mut record = CrawlRecord::with_history(at(5_000), at(5_000));

        for start in [at(5_000), at(5_001), at(1)] {
            assert_eq!(record.plan_pass(start, &policy), CrawlMode::Full);
            assert_eq!(record.last_full_traversal(), UNIX_EPOCH);
            record.complete_pass(start, CrawlMode::Full);
        }
    }

    #[test]
    fn test_negative_interval_always_incremental() {
        let policy = policy(None, 100);
        let mut record = CrawlRecord::with_history(UNIX_EPOCH, at(1_000));

        let mode = record.plan_pass(at(1_000_000_000), &policy);
        assert_eq!(mode, CrawlMode::Incremental { since: at(900) });
    }

    #[test]
    fn test_threshold_never_below_epoch() {
        let policy = policy(None, 3_600);
        let mut record = CrawlRecord::with_history(UNIX_EPOCH, at(10));
        assert_eq!(
            record.plan_pass(at(20), &policy),
            CrawlMode::Incremental { since: UNIX_EPOCH }
        );

        let mut fresh = CrawlRecord::new();
        assert_eq!(fresh.plan_pass(at(20), &policy).threshold(), UNIX_EPOCH);
    }

    #[test]
    fn test_positive_interval_boundary() {
        let policy = policy(Some(1_000), 50);
        let mut record = CrawlRecord::with_history(at(10_000), at(10_500));

        // Before last_full + interval: incremental.
        assert_eq!(
            record.plan_pass(at(10_999), &policy),
            CrawlMode::Incremental { since: at(10_450) }
        );
        assert_eq!(record.last_full_traversal(), at(10_000));

        // At last_full + interval: forced full, last_full reset.
        assert_eq!(record.plan_pass(at(11_000), &policy), CrawlMode::Full);
        assert_eq!(record.last_full_traversal(), UNIX_EPOCH);
    }

    #[test]
    fn test_first_pass_is_full_with_interval() {
        let mut record = CrawlRecord::new();
        assert_eq!(
            record.plan_pass(at(100), &policy(Some(86_400), 3_600)),
            CrawlMode::Full
        );
    }

    #[test]
    fn test_complete_pass_updates_history() {
        let mut record = CrawlRecord::new();
        record.complete_pass(at(100), CrawlMode::Full);
        assert_eq!(record.last_full_traversal(), at(100));
        assert_eq!(record.last_traversal(), at(100));

        record.complete_pass(at(200), CrawlMode::Incremental { since: at(40) });
        assert_eq!(record.last_full_traversal(), at(100));
        assert_eq!(record.last_traversal(), at(200));
    }

    #[test]
    fn test_unfinished_full_pass_is_retried() {
        let policy = policy(Some(1_000), 0);
        let mut record = CrawlRecord::with_history(at(0), at(500));

        assert_eq!(record.plan_pass(at(2_000), &policy), CrawlMode::Full);
        // Pass aborted: no complete_pass. The next pass is full again.
        assert_eq!(record.plan_pass(at(2_100), &policy), CrawlMode::Full);
    }

    #[test]
    fn test_mode_threshold_helpers() {
        assert_eq!(CrawlMode::Full.modified_since(), None);
        assert_eq!(
            CrawlMode::Incremental { since: at(7) }.modified_since(),
            Some(at(7))
        );
        assert_eq!(CrawlMode::Incremental { since: at(7) }.threshold(), at(7));
    }

    #[test]
    fn test_policy_from_config() {
        let config = CrawlConfig {
            full_traversal_interval_secs: -1,
            cushion_secs: 5,
            ..CrawlConfig::default()
        };
        let policy = TraversalPolicy::from_config(&config);
        assert_eq!(policy.full_traversal_interval, None);
        assert_eq!(policy.cushion, Duration::from_secs(5));
    }
}
