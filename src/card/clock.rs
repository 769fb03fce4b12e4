use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};

use acinfinity_api::error::{CardError, CardResult};

/// Wall clock as shown in the card header, e.g. `9:05 AM`.
pub fn format_clock<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    now.format("%-I:%M %p").to_string()
}

/// Periodic re-render trigger for the clock display.
///
/// At most one tick task runs at a time. The task is aborted on [`stop`](Self::stop)
/// and when the ticker is dropped.
#[derive(Debug)]
pub struct ClockTicker {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl Default for ClockTicker {
    fn default() -> Self {
        Self::new(Self::PERIOD)
    }
}

impl ClockTicker {
    pub const PERIOD: Duration = Duration::from_secs(60);

    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start ticking. Returns `false` if a tick task is already running.
    pub fn start<F>(&mut self, mut on_tick: F) -> CardResult<bool>
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_running() {
            return Ok(false);
        }

        let handle = Handle::try_current().map_err(|_| CardError::NoRuntime)?;
        let period = self.period;

        self.task = Some(handle.spawn(async move {
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                on_tick();
            }
        }));

        log::trace!("Clock ticker started ({}s)", period.as_secs());
        Ok(true)
    }

    /// Stop ticking. Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.abort();
        log::trace!("Clock ticker stopped");
        true
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use tokio::time::{Duration, sleep};

    use acinfinity_api::error::CardError;

    use crate::card::clock::{ClockTicker, format_clock};

    #[test]
    fn twelve_hour_clock() {
        let morning = Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 5, 1, 21, 45, 0).unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        assert_eq!(format_clock(&morning), "9:05 AM");
        assert_eq!(format_clock(&evening), "9:45 PM");
        assert_eq!(format_clock(&midnight), "12:00 AM");
        assert_eq!(format_clock(&noon), "12:30 PM");
    }

    #[test]
    fn start_needs_runtime() {
        let mut ticker = ClockTicker::default();
        assert!(matches!(ticker.start(|| {}), Err(CardError::NoRuntime)));
        assert!(!ticker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut ticker = ClockTicker::default();

        let counter = count.clone();
        assert!(ticker.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }).unwrap());

        sleep(Duration::from_secs(59)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_ignored() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut ticker = ClockTicker::default();

        let first = count.clone();
        assert!(ticker.start(move || {
            first.fetch_add(1, Ordering::SeqCst);
        }).unwrap());
        let second = count.clone();
        assert!(!ticker.start(move || {
            second.fetch_add(1, Ordering::SeqCst);
        }).unwrap());

        sleep(Duration::from_secs(61)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_and_drop_cancel_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut ticker = ClockTicker::default();

        let counter = count.clone();
        ticker.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }).unwrap();
        assert!(ticker.stop());
        assert!(!ticker.stop());

        sleep(Duration::from_secs(180)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let counter = count.clone();
        ticker.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }).unwrap();
        drop(ticker);

        sleep(Duration::from_secs(180)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
