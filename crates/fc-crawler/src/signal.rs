//! Wake-up channel for the scheduler's control thread.
//!
//! Every interruption of a scheduler sleep carries a [`WakeReason`], so the
//! control loop never has to guess why it woke. A shutdown request is
//! sticky: once raised it is reported by every later wait and is never
//! replaced by a schedule change.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use fc_crawler::{Pause, WakeReason, WakeSignal};
//!
//! let signal = WakeSignal::new();
//! signal.notify(WakeReason::ScheduleChanged);
//! assert_eq!(signal.wait(Pause::Indefinite), Some(WakeReason::ScheduleChanged));
//! assert_eq!(signal.wait(Pause::For(Duration::from_millis(1))), None);
//! ```

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::schedule::Pause;

/// Why a sleeping scheduler was woken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakeReason {
    /// The schedule was replaced.
    ScheduleChanged,
    /// Shutdown was requested.
    Shutdown,
}

/// Mutex and condition variable carrying the pending [`WakeReason`].
#[derive(Debug, Default)]
pub struct WakeSignal {
    pending: Mutex<Option<WakeReason>>,
    condvar: Condvar,
}

impl WakeSignal {
    /// Creates a signal with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises `reason` and wakes every waiter.
    pub fn notify(&self, reason: WakeReason) {
        let mut pending = self.pending.lock();
        if *pending != Some(WakeReason::Shutdown) {
            *pending = Some(reason);
        }
        self.condvar.notify_all();
    }

    /// Returns `true` once shutdown has been raised.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.pending.lock() == Some(WakeReason::Shutdown)
    }

    /// Consumes the pending reason without waiting.
    pub fn take(&self) -> Option<WakeReason> {
        Self::consume(&mut self.pending.lock())
    }

    /// Sleeps for `pause` or until a reason is raised.
    ///
    /// Returns the reason that cut the sleep short, or `None` if the pause
    /// ran its course. A reason raised before the call is returned at once.
    pub fn wait(&self, pause: Pause) -> Option<WakeReason> {
        let mut pending = self.pending.lock();
        match pause {
            Pause::Immediate => {}
            Pause::For(duration) => match Instant::now().checked_add(duration) {
                Some(deadline) => {
                    while pending.is_none() {
                        if self.condvar.wait_until(&mut pending, deadline).timed_out() {
                            break;
                        }
                    }
                }
                None => {
                    while pending.is_none() {
                        self.condvar.wait(&mut pending);
                    }
                }
            },
            Pause::Indefinite => {
                while pending.is_none() {
                    self.condvar.wait(&mut pending);
                }
            }
        }
        Self::consume(&mut pending)
    }

    fn consume(pending: &mut Option<WakeReason>) -> Option<WakeReason> {
        match *pending {
            Some(WakeReason::Shutdown) => Some(WakeReason::Shutdown),
            _ => pending.take(),
        }
    }
}
