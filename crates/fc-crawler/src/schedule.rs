//! Traversal schedules.
//!
//! A [`Schedule`] answers two questions for the scheduler: how long until the
//! next tick is due, and how long to rest after a successful tick. Raw answers
//! are in seconds with negative meaning "indefinitely"; [`Pause`] is the
//! typed form the scheduler sleeps on.

use std::fmt;
use std::time::Duration;

use chrono::{Local, NaiveTime, Timelike};
use fc_core::{ConfigError, HourWindow, ScheduleConfig};

const SECONDS_PER_DAY: i64 = 86_400;

/// Operator-controlled traversal schedule.
pub trait Schedule: Send + Sync + fmt::Debug {
    /// Returns `true` if traversal is switched off.
    fn is_disabled(&self) -> bool;

    /// Seconds until the next tick is due; `0` is now, negative is never.
    fn seconds_until_due(&self) -> i64;

    /// Seconds to wait after a successful tick; negative waits indefinitely.
    fn retry_delay_seconds(&self) -> i64;
}

/// How long the scheduler sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pause {
    /// Do not sleep at all.
    Immediate,
    /// Sleep for a fixed duration unless woken.
    For(Duration),
    /// Sleep until woken.
    Indefinite,
}

impl Pause {
    /// Converts raw schedule seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use fc_crawler::Pause;
    ///
    /// assert_eq!(Pause::from_seconds(0), Pause::Immediate);
    /// assert_eq!(Pause::from_seconds(-1), Pause::Indefinite);
    /// assert_eq!(Pause::from_seconds(90), Pause::For(Duration::from_secs(90)));
    /// ```
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        if seconds == 0 {
            Self::Immediate
        } else if seconds < 0 {
            Self::Indefinite
        } else {
            Self::For(Duration::from_secs(seconds.unsigned_abs()))
        }
    }

    /// The pause before the next tick.
    #[must_use]
    pub fn until_due(schedule: &dyn Schedule) -> Self {
        if schedule.is_disabled() {
            Self::Indefinite
        } else {
            Self::from_seconds(schedule.seconds_until_due())
        }
    }

    /// The pause after a successful tick.
    #[must_use]
    pub fn after_success(schedule: &dyn Schedule) -> Self {
        if schedule.is_disabled() {
            Self::Indefinite
        } else {
            Self::from_seconds(schedule.retry_delay_seconds())
        }
    }
}

impl fmt::Display for Pause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("none"),
            Self::For(duration) => write!(f, "{}s", duration.as_secs()),
            Self::Indefinite => f.write_str("indefinite"),
        }
    }
}

/// A schedule that is due inside configured hours of the local day.
///
/// With no windows the schedule is always due.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use fc_core::HourWindow;
/// use fc_crawler::WindowedSchedule;
///
/// let schedule = WindowedSchedule::new(900).with_window(HourWindow::new(22, 24).unwrap());
/// let eight_pm = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
/// assert_eq!(schedule.seconds_until_due_at(eight_pm), 2 * 3_600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedSchedule {
    disabled: bool,
    retry_delay_secs: i64,
    windows: Vec<HourWindow>,
}

impl WindowedSchedule {
    /// An always-due schedule with the given retry delay.
    #[must_use]
    pub const fn new(retry_delay_secs: i64) -> Self {
        Self {
            disabled: false,
            retry_delay_secs,
            windows: Vec::new(),
        }
    }

    /// A schedule that never runs.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            disabled: true,
            retry_delay_secs: -1,
            windows: Vec::new(),
        }
    }

    /// Builds a schedule from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSchedule`] for a malformed window.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            disabled: config.disabled,
            retry_delay_secs: config.retry_delay_secs,
            windows: config.hour_windows()?,
        })
    }

    /// Adds an hour window.
    #[must_use]
    pub fn with_window(mut self, window: HourWindow) -> Self {
        self.windows.push(window);
        self
    }

    /// The configured windows.
    #[must_use]
    pub fn windows(&self) -> &[HourWindow] {
        &self.windows
    }

    /// Seconds from `time` until a window is open.
    #[must_use]
    pub fn seconds_until_due_at(&self, time: NaiveTime) -> i64 {
        if self.windows.is_empty() || self.windows.iter().any(|w| w.contains(time.hour())) {
            return 0;
        }

        let now = i64::from(time.num_seconds_from_midnight());
        self.windows
            .iter()
            .map(|w| {
                let start = i64::from(w.start()) * 3_600;
                (start - now).rem_euclid(SECONDS_PER_DAY)
            })
            .min()
            .unwrap_or(0)
    }
}

impl Schedule for WindowedSchedule {
    fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn seconds_until_due(&self) -> i64 {
        self.seconds_until_due_at(Local::now().time())
    }

    fn retry_delay_seconds(&self) -> i64 {
        self.retry_delay_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn window(start: u32, end: u32) -> HourWindow {
        HourWindow::new(start, end).unwrap()
    }

    #[test]
    fn test_no_windows_always_due() {
        let schedule = WindowedSchedule::new(60);
        assert_eq!(schedule.seconds_until_due_at(time(3, 14, 15)), 0);
        assert_eq!(schedule.seconds_until_due(), 0);
        assert_eq!(schedule.retry_delay_seconds(), 60);
    }

    #[test]
    fn test_inside_window_is_due() {
        let schedule = WindowedSchedule::new(60).with_window(window(9, 17));
        assert_eq!(schedule.seconds_until_due_at(time(9, 0, 0)), 0);
        assert_eq!(schedule.seconds_until_due_at(time(16, 59, 59)), 0);
    }

    #[test]
    fn test_waits_for_next_window() {
        let schedule = WindowedSchedule::new(60)
            .with_window(window(1, 3))
            .with_window(window(20, 22));

        assert_eq!(schedule.seconds_until_due_at(time(19, 30, 0)), 1_800);
        // Past the last window: wraps to tomorrow's first.
        assert_eq!(schedule.seconds_until_due_at(time(23, 0, 0)), 2 * 3_600);
        assert_eq!(schedule.seconds_until_due_at(time(0, 59, 30)), 30);
    }

    #[test]
    fn test_from_config() {
        let config = ScheduleConfig {
            disabled: true,
            retry_delay_secs: -1,
            windows: vec!["2-4".to_owned()],
        };
        let schedule = WindowedSchedule::from_config(&config).unwrap();
        assert!(schedule.is_disabled());
        assert_eq!(schedule.windows(), &[window(2, 4)]);

        let bad = ScheduleConfig {
            windows: vec!["nine-five".to_owned()],
            ..ScheduleConfig::default()
        };
        assert!(WindowedSchedule::from_config(&bad).is_err());
    }

    #[test]
    fn test_pause_from_schedule() {
        let disabled = WindowedSchedule::disabled();
        assert_eq!(Pause::until_due(&disabled), Pause::Indefinite);
        assert_eq!(Pause::after_success(&disabled), Pause::Indefinite);

        let always = WindowedSchedule::new(120);
        assert_eq!(Pause::until_due(&always), Pause::Immediate);
        assert_eq!(
            Pause::after_success(&always),
            Pause::For(Duration::from_secs(120))
        );
        assert_eq!(
            Pause::after_success(&WindowedSchedule::new(-5)),
            Pause::Indefinite
        );
    }

    #[test]
    fn test_pause_display() {
        assert_eq!(Pause::Immediate.to_string(), "none");
        assert_eq!(Pause::For(Duration::from_secs(900)).to_string(), "900s");
        assert_eq!(Pause::Indefinite.to_string(), "indefinite");
    }
}
