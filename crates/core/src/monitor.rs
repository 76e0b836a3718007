//! Periodic battery and sleep-state monitoring.
//!
//! The wireless mouse powers its radio down after a few seconds idle and
//! stops answering queries until the user moves it. A poll that times out
//! after earlier successes therefore means "asleep", not "gone" — the
//! monitor folds that interpretation into a [`BatteryStatus`] callers can
//! display as-is.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::session::Session;
use crate::settings::{BatteryLevel, BatteryStatus, SleepState};

/// Default gap between battery polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);
/// How long the radio stays awake after the last activity. Timeouts later
/// than this are the normal sleep pattern, not a fault.
pub const SLEEP_WINDOW: Duration = Duration::from_secs(5);

/// Tracks battery observations across polls.
pub struct StatusMonitor {
    interval: Duration,
    last_poll: Option<Instant>,
    last_heard: Option<Instant>,
    last_status: Option<BatteryStatus>,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self::with_interval(POLL_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
            last_heard: None,
            last_status: None,
        }
    }

    /// Whether enough time has passed that [`poll`](Self::poll) should run.
    pub fn poll_due(&self) -> bool {
        match self.last_poll {
            None => true,
            Some(t) => t.elapsed() >= self.interval,
        }
    }

    /// Query the battery once and fold the outcome into a status.
    ///
    /// Errors degrade the status instead of propagating: the caller keeps
    /// polling on schedule and the next successful query recovers.
    pub fn poll(&mut self, session: &mut Session) -> BatteryStatus {
        self.last_poll = Some(Instant::now());
        let status = match session.read_battery() {
            Ok(report) => {
                self.last_heard = Some(Instant::now());
                BatteryStatus {
                    level: if report.charging {
                        BatteryLevel::Charging
                    } else {
                        BatteryLevel::Percent(report.percent)
                    },
                    sleep: SleepState::Awake,
                }
            }
            Err(e) => self.degrade(&e),
        };

        if self.last_status != Some(status) {
            info!(status = %status, "Battery status changed");
        }
        self.last_status = Some(status);
        status
    }

    fn degrade(&self, err: &Error) -> BatteryStatus {
        let sleep = match err {
            Error::Timeout(_) | Error::DeviceUnresponsive { .. } if self.last_heard.is_some() => {
                let recent = self
                    .last_heard
                    .map(|t| t.elapsed() < SLEEP_WINDOW)
                    .unwrap_or(false);
                if recent {
                    warn!("Mouse went quiet inside its wake window");
                } else {
                    debug!("Mouse asleep, radio idled out");
                }
                SleepState::Asleep
            }
            _ => {
                warn!(error = %err, "Battery poll failed");
                SleepState::Unknown
            }
        };
        BatteryStatus {
            level: BatteryLevel::Unknown,
            sleep,
        }
    }

    /// Most recent folded status, if a poll has run.
    pub fn last_status(&self) -> Option<BatteryStatus> {
        self.last_status
    }

    /// When the mouse last answered a poll.
    pub fn last_heard(&self) -> Option<Instant> {
        self.last_heard
    }
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self::new()
    }
}
