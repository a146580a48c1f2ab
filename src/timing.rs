use chrono::{DateTime, Local, NaiveTime, Timelike, Utc};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

const BLANK_CLOCK: &str = "00:00:00:000";

/// Source of wall-clock time (swapped for a fixed clock in tests).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Distance in milliseconds from the nearest whole second.
///
/// Below 500 the clock is still running up to the next boundary; from 500
/// on it has just passed one and the distance is measured backwards.
pub fn sample_deviation(millis: u16) -> u32 {
    debug_assert!(millis < 1000, "millisecond of second out of range: {millis}");
    let millis = u32::from(millis);
    if millis < 500 { millis } else { 1000 - millis }
}

/// `HH:MM:SS:mmm`, the format shown on the game screen.
pub fn format_clock(time: NaiveTime) -> String {
    format!(
        "{:02}:{:02}:{:02}:{:03}",
        time.hour(),
        time.minute(),
        time.second(),
        millis_of_second(time)
    )
}

fn millis_of_second(time: NaiveTime) -> u16 {
    // leap-second nanos run past 1e9; fold them into the last millisecond
    (time.nanosecond() / 1_000_000).min(999) as u16
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reading {
    pub clock: String,
    pub millis: u16,
}

impl Default for Reading {
    fn default() -> Self {
        Self {
            clock: BLANK_CLOCK.to_string(),
            millis: 0,
        }
    }
}

impl Reading {
    fn at(now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&Local).time();
        Self {
            clock: format_clock(local),
            millis: millis_of_second(now.time()),
        }
    }

    pub fn deviation(&self) -> u32 {
        sample_deviation(self.millis)
    }
}

/// Periodically samples the clock while running and keeps the last reading.
///
/// A press never triggers a sample of its own: it reads whatever the last
/// tick computed.
pub struct TimingSampler {
    clock: Arc<dyn Clock>,
    period: Duration,
    reading: Arc<watch::Sender<Reading>>,
    ticker: Option<JoinHandle<()>>,
}

impl TimingSampler {
    pub fn new(clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (reading, _) = watch::channel(Reading::default());
        Self {
            clock,
            period: period.max(Duration::from_millis(1)),
            reading: Arc::new(reading),
            ticker: None,
        }
    }

    pub fn tick(&self) -> Reading {
        let reading = Reading::at(self.clock.now());
        self.reading.send_replace(reading.clone());
        reading
    }

    /// Must be called from within a tokio runtime. No-op when already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.tick();

        let clock = Arc::clone(&self.clock);
        let reading = Arc::clone(&self.reading);
        let period = self.period;
        self.ticker = Some(tokio::spawn(async move {
            // the first sample was taken above
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                reading.send_replace(Reading::at(clock.now()));
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Clears the display; recorded attempts are untouched.
    pub fn reset(&mut self) {
        self.reading.send_replace(Reading::default());
    }

    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|ticker| !ticker.is_finished())
    }

    pub fn reading(&self) -> Reading {
        self.reading.borrow().clone()
    }
}

impl Drop for TimingSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    pub(crate) struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub(crate) fn at_millis(millis: u32) -> Arc<Self> {
            let base = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
            Arc::new(Self(Mutex::new(
                base + chrono::Duration::milliseconds(i64::from(millis)),
            )))
        }

        pub(crate) fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap() = now;
        }

        pub(crate) fn advance(&self, by: chrono::Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn deviation_boundaries() {
        assert_eq!(sample_deviation(0), 0);
        assert_eq!(sample_deviation(1), 1);
        assert_eq!(sample_deviation(499), 499);
        assert_eq!(sample_deviation(500), 500);
        assert_eq!(sample_deviation(501), 499);
        assert_eq!(sample_deviation(999), 1);
    }

    #[test]
    fn deviation_stays_within_half_a_second() {
        for millis in 0..1000u16 {
            let deviation = sample_deviation(millis);
            assert!(deviation <= 500, "{millis} -> {deviation}");
        }
    }

    #[test]
    fn clock_format_pads_every_field() {
        let time = NaiveTime::from_hms_milli_opt(7, 5, 3, 42).unwrap();
        assert_eq!(format_clock(time), "07:05:03:042");
    }

    #[tokio::test]
    async fn start_samples_immediately_and_stop_freezes() {
        let clock = FixedClock::at_millis(7);
        let mut sampler = TimingSampler::new(clock.clone(), TICK_INTERVAL);
        assert_eq!(sampler.reading(), Reading::default());

        sampler.start();
        assert!(sampler.is_running());
        assert_eq!(sampler.reading().millis, 7);
        assert!(sampler.reading().clock.ends_with(":007"));

        sampler.stop();
        assert!(!sampler.is_running());
        clock.advance(chrono::Duration::milliseconds(300));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sampler.reading().millis, 7);
    }

    #[tokio::test]
    async fn ticker_follows_the_clock() {
        let clock = FixedClock::at_millis(120);
        let mut sampler = TimingSampler::new(clock.clone(), TICK_INTERVAL);
        sampler.start();
        clock.advance(chrono::Duration::milliseconds(800));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sampler.reading().millis, 920);
        assert_eq!(sampler.reading().deviation(), 80);
    }

    #[tokio::test]
    async fn reset_clears_display_only() {
        let clock = FixedClock::at_millis(640);
        let mut sampler = TimingSampler::new(clock, TICK_INTERVAL);
        sampler.start();
        sampler.stop();
        assert_eq!(sampler.reading().millis, 640);
        sampler.reset();
        assert_eq!(sampler.reading(), Reading::default());
        assert!(!sampler.is_running());
    }
}
