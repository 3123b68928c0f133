//! Configuration structures for the fscrawl crawler.
//!
//! This module provides configuration types for all components of the crawler:
//!
//! - [`CrawlConfig`] - Start paths, worker count, full/incremental intervals
//! - [`FilterConfig`] - Include/exclude patterns, size limit, MIME exclusions
//! - [`ScheduleConfig`] - Disabled flag, retry delay, hour windows
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and use `#[serde(default)]`,
//! so a partial JSON file only needs to name the options it changes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::root::RootSpecs;

/// Default number of concurrent root traversals.
pub const DEFAULT_THREAD_COUNT: usize = 10;

/// Default interval between forced full traversals (one day).
pub const DEFAULT_FULL_TRAVERSAL_INTERVAL_SECS: i64 = 86_400;

/// Default clock skew cushion for incremental traversals (one hour).
pub const DEFAULT_CUSHION_SECS: u64 = 3_600;

/// Default delay after a tick in which any root failed (15 minutes).
pub const DEFAULT_ERROR_DELAY_SECS: u64 = 900;

/// Default maximum document size (30 MiB).
pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = 30 * 1024 * 1024;

/// Configuration for the crawl itself.
///
/// # Examples
///
/// ```
/// use fc_core::CrawlConfig;
///
/// let config = CrawlConfig::default();
/// assert_eq!(config.thread_count, 10);
/// assert_eq!(config.error_delay().as_secs(), 900);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Root paths to crawl, one traversal per path per tick.
    pub start_paths: Vec<String>,

    /// Upper bound on concurrently running root traversals.
    pub thread_count: usize,

    /// Seconds between forced full traversals.
    ///
    /// Negative disables forced full traversals; zero makes every pass full.
    pub full_traversal_interval_secs: i64,

    /// Seconds subtracted from the last traversal time to absorb clock skew.
    pub cushion_secs: u64,

    /// Seconds to sleep after a tick in which any root failed.
    pub error_delay_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_paths: Vec::new(),
            thread_count: DEFAULT_THREAD_COUNT,
            full_traversal_interval_secs: DEFAULT_FULL_TRAVERSAL_INTERVAL_SECS,
            cushion_secs: DEFAULT_CUSHION_SECS,
            error_delay_secs: DEFAULT_ERROR_DELAY_SECS,
        }
    }
}

impl CrawlConfig {
    /// Returns the full traversal interval, or `None` if full traversals are
    /// never forced.
    #[must_use]
    pub fn full_traversal_interval(&self) -> Option<Duration> {
        u64::try_from(self.full_traversal_interval_secs)
            .ok()
            .map(Duration::from_secs)
    }

    /// Returns the clock skew cushion.
    #[inline]
    #[must_use]
    pub const fn cushion(&self) -> Duration {
        Duration::from_secs(self.cushion_secs)
    }

    /// Returns the delay used after a failed tick.
    #[inline]
    #[must_use]
    pub const fn error_delay(&self) -> Duration {
        Duration::from_secs(self.error_delay_secs)
    }
}

/// Configuration for which filesystem entries qualify as documents.
///
/// # Examples
///
/// ```
/// use fc_core::FilterConfig;
///
/// let config = FilterConfig::default();
/// assert_eq!(config.include_patterns, vec!["*"]);
/// assert!(config.exclude_patterns.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Glob patterns a file must match to be crawled. Empty accepts all.
    pub include_patterns: Vec<String>,

    /// Glob patterns that reject files and prune directories.
    pub exclude_patterns: Vec<String>,

    /// Largest document size in bytes, or `None` to skip size and type checks.
    pub max_document_size: Option<u64>,

    /// MIME types that are never surfaced as documents.
    pub excluded_mime_types: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_patterns: vec!["*".to_owned()],
            exclude_patterns: Vec::new(),
            max_document_size: Some(DEFAULT_MAX_DOCUMENT_SIZE),
            excluded_mime_types: Vec::new(),
        }
    }
}

/// Configuration for the traversal schedule.
///
/// # Examples
///
/// ```
/// use fc_core::ScheduleConfig;
///
/// let config = ScheduleConfig::default();
/// assert!(!config.disabled);
/// assert!(config.windows.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Whether traversal is disabled entirely.
    pub disabled: bool,

    /// Seconds to wait after a successful tick. Negative waits indefinitely.
    pub retry_delay_secs: i64,

    /// Hour-of-day windows (`"start-end"`) during which traversal may run.
    ///
    /// An empty list means traversal is always due.
    pub windows: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            retry_delay_secs: 900,
            windows: Vec::new(),
        }
    }
}

impl ScheduleConfig {
    /// Parses all configured windows.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSchedule`] for the first malformed window.
    pub fn hour_windows(&self) -> Result<Vec<HourWindow>, ConfigError> {
        self.windows.iter().map(|w| w.parse()).collect()
    }
}

/// A half-open range of hours `[start, end)` within a day.
///
/// # Examples
///
/// ```
/// use fc_core::HourWindow;
///
/// let window: HourWindow = "9-17".parse().unwrap();
/// assert!(window.contains(9));
/// assert!(!window.contains(17));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HourWindow {
    start: u32,
    end: u32,
}

impl HourWindow {
    /// Creates a window, validating `start < end <= 24`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSchedule`] if the bounds are out of range.
    pub fn new(start: u32, end: u32) -> Result<Self, ConfigError> {
        if end > 24 {
            return Err(ConfigError::invalid_schedule(
                format!("{start}-{end}"),
                "end hour must be at most 24",
            ));
        }
        if start >= end {
            return Err(ConfigError::invalid_schedule(
                format!("{start}-{end}"),
                "start hour must precede end hour",
            ));
        }
        Ok(Self { start, end })
    }

    /// First hour of the window.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Hour at which the window closes.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.end
    }

    /// Returns `true` if `hour` falls inside the window.
    #[inline]
    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

impl FromStr for HourWindow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| ConfigError::invalid_schedule(s, "expected 'start-end'"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| ConfigError::invalid_schedule(s, e.to_string()))
        };
        Self::new(parse(start)?, parse(end)?)
    }
}

impl fmt::Display for HourWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Root configuration for the crawler.
///
/// # Examples
///
/// ```
/// use fc_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"crawl": {"start_paths": ["/srv/docs"]}}"#).unwrap();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawl configuration.
    pub crawl: CrawlConfig,

    /// Filter configuration.
    pub filter: FilterConfig,

    /// Schedule configuration.
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their default values. The result is not validated;
    /// call [`Config::validate`] before use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid JSON.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Validates option values and start paths.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.thread_count == 0 {
            return Err(ConfigError::invalid_option(
                "thread_count",
                "must be at least 1",
            ));
        }
        if self.crawl.start_paths.is_empty() {
            return Err(ConfigError::MissingStartPaths);
        }
        if self.filter.max_document_size == Some(0) {
            return Err(ConfigError::invalid_option(
                "max_document_size",
                "must be positive when set",
            ));
        }
        self.schedule.hour_windows()?;
        self.root_specs()?;
        Ok(())
    }

    /// Normalizes and deduplicates the configured start paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] for a blank start path.
    pub fn root_specs(&self) -> Result<RootSpecs, ConfigError> {
        RootSpecs::from_paths(&self.crawl.start_paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_config_defaults() {
        let config = CrawlConfig::default();
        assert_eq!(config.thread_count, DEFAULT_THREAD_COUNT);
        assert_eq!(
            config.full_traversal_interval(),
            Some(Duration::from_secs(86_400))
        );
        assert_eq!(config.cushion(), Duration::from_secs(3_600));
        assert_eq!(config.error_delay(), Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_negative_full_interval_disables_full_traversals() {
        let config = CrawlConfig {
            full_traversal_interval_secs: -1,
            ..CrawlConfig::default()
        };
        assert_eq!(config.full_traversal_interval(), None);

        let config = CrawlConfig {
            full_traversal_interval_secs: 0,
            ..CrawlConfig::default()
        };
        assert_eq!(config.full_traversal_interval(), Some(Duration::ZERO));
    }

    #[test]
    fn test_filter_config_defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.include_patterns, vec!["*"]);
        assert_eq!(config.max_document_size, Some(DEFAULT_MAX_DOCUMENT_SIZE));
        assert!(config.excluded_mime_types.is_empty());
    }

    #[test]
    fn test_hour_window_parsing() {
        let window: HourWindow = "1-24".parse().unwrap();
        assert_eq!(window.start(), 1);
        assert_eq!(window.end(), 24);
        assert!(window.contains(23));
        assert!(!window.contains(0));
        assert_eq!(window.to_string(), "1-24");

        assert!(" 8 - 12 ".parse::<HourWindow>().is_ok());
        assert!("12-8".parse::<HourWindow>().is_err());
        assert!("0-25".parse::<HourWindow>().is_err());
        assert!("noon".parse::<HourWindow>().is_err());
        assert!("a-b".parse::<HourWindow>().is_err());
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"crawl": {"start_paths": ["/data"], "thread_count": 2}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.crawl.thread_count, 2);
        assert_eq!(config.crawl.cushion_secs, DEFAULT_CUSHION_SECS);
        assert_eq!(config.filter.include_patterns, vec!["*"]);
        assert_eq!(config.schedule.retry_delay_secs, 900);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let mut config = Config::default();
        config.crawl.start_paths.push("/data".to_owned());
        config.schedule.windows.push("2-6".to_owned());
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_validate_rejects_bad_options() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingStartPaths)
        ));

        config.crawl.start_paths.push("/data".to_owned());
        assert!(config.validate().is_ok());

        config.crawl.thread_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { .. })
        ));

        config.crawl.thread_count = 1;
        config.schedule.windows.push("5-3".to_owned());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSchedule { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fscrawl.json");
        std::fs::write(&path, r#"{"crawl": {"start_paths": ["/a", "/b"]}}"#).unwrap();

        let path = Utf8Path::from_path(&path).unwrap();
        let config = Config::load(path).unwrap();
        assert_eq!(config.crawl.start_paths.len(), 2);

        let missing = Config::load(Utf8Path::new("/nonexistent/fscrawl.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
