//! Countdown primitive shared by both invitation engines
//!
//! A `Countdown` runs at most one interval at a time. Starting a new run
//! cancels the previous one, cancelling is idempotent, and the counter stops
//! at zero.

use engram_core::TaskSlot;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Seconds-resolution countdown with tick and expiry callbacks
#[derive(Debug)]
pub struct Countdown {
    period: Duration,
    slot: TaskSlot,
}

impl Countdown {
    /// Create countdown stepping once per `period`
    #[inline]
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            slot: TaskSlot::new(),
        }
    }

    /// Start counting down from `total`
    ///
    /// `on_tick` receives `total` immediately, then each remaining value down
    /// to 0, one per period. `on_expire` runs once after the 0 tick and the
    /// run ends itself. Any previous run is cancelled first and never
    /// invokes its callbacks again.
    pub fn start<T, E>(&self, total: u64, mut on_tick: T, on_expire: E)
    where
        T: FnMut(u64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        self.slot.cancel();
        on_tick(total);

        let period = self.period;
        self.slot.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut remaining = total;
            while remaining > 0 {
                ticker.tick().await;
                remaining -= 1;
                on_tick(remaining);
            }
            on_expire();
        });
    }

    /// Stop the current run, if any
    #[inline]
    pub fn cancel(&self) {
        self.slot.cancel();
    }

    /// Whether a run is in progress
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.slot.is_active()
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Display style of remaining time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownFormat {
    /// `1h 01m` from one hour up, `m:ss` below
    HoursMinutes,
    /// Always `m:ss`
    MinutesSeconds,
}

impl CountdownFormat {
    /// Render `seconds` remaining
    #[must_use]
    pub fn render(self, seconds: u64) -> String {
        let hours = seconds / 3600;
        match self {
            Self::HoursMinutes if hours > 0 => {
                format!("{hours}h {:02}m", (seconds % 3600) / 60)
            }
            Self::HoursMinutes => format!("{}:{:02}", (seconds % 3600) / 60, seconds % 60),
            Self::MinutesSeconds => format!("{}:{:02}", seconds / 60, seconds % 60),
        }
    }
}
