//! Network time synchronization
//!
//! After the link is up the device asks its clock collaborator to start a
//! network sync, then polls the wall clock a fixed number of times until it
//! reports something that looks like real time rather than seconds since
//! boot. The poll is bounded; failing to sync only costs the "updated at"
//! stamp and day/night selection, never the wake cycle.

use core::fmt;
use core::future::Future;

use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};
use thiserror_no_std::Error;

/// Number of wall-clock polls before giving up
pub const SYNC_POLL_ATTEMPTS: u32 = 20;

/// Delay between wall-clock polls
pub const SYNC_POLL_INTERVAL_MS: u32 = 500;

/// Any clock value at or below this (2020-09-13 UTC) is boot-relative time
pub const PLAUSIBLE_EPOCH_SECS: u64 = 1_600_000_000;

/// Seconds between the NTP era origin (1900-01-01) and the Unix epoch
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const SECS_PER_DAY: i64 = 86_400;

/// Seconds since the Unix epoch, UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_unix_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub const fn as_unix_secs(self) -> u64 {
        self.0
    }

    /// Convert the seconds field of an NTP timestamp (era 0).
    ///
    /// `None` for values before the Unix epoch, which a server only sends
    /// when it has no time itself.
    pub fn from_ntp_seconds(ntp_secs: u32) -> Option<Self> {
        u64::from(ntp_secs).checked_sub(NTP_UNIX_OFFSET).map(Self)
    }

    /// Seconds into the local day for a fixed UTC offset
    fn local_seconds_of_day(self, utc_offset_minutes: i16) -> u32 {
        let local = self.0 as i64 + i64::from(utc_offset_minutes) * 60;
        local.rem_euclid(SECS_PER_DAY) as u32
    }

    /// Local hour of day, `0..=23`
    pub fn local_hour(self, utc_offset_minutes: i16) -> u8 {
        (self.local_seconds_of_day(utc_offset_minutes) / 3600) as u8
    }

    /// Local minute of the hour, `0..=59`
    pub fn local_minute(self, utc_offset_minutes: i16) -> u8 {
        (self.local_seconds_of_day(utc_offset_minutes) % 3600 / 60) as u8
    }

    /// Local time of day for display
    pub fn local_clock(self, utc_offset_minutes: i16) -> ClockTime {
        ClockTime {
            hour: self.local_hour(utc_offset_minutes),
            minute: self.local_minute(utc_offset_minutes),
        }
    }
}

/// Hour and minute of the local day, formatted as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u8,
    pub minute: u8,
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    #[error("time sync could not be started")]
    StartFailed,
}

/// Wall clock that can be disciplined from the network.
pub trait NetworkClock {
    /// Kick off a network time sync. The clock may be updated later.
    fn start_sync(&mut self) -> impl Future<Output = Result<(), ClockError>>;

    /// Current wall-clock reading in seconds since the Unix epoch
    fn now_unix(&mut self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncOutcome {
    Synced(Timestamp),
    Failed,
}

impl TimeSyncOutcome {
    pub fn timestamp(self) -> Option<Timestamp> {
        match self {
            Self::Synced(ts) => Some(ts),
            Self::Failed => None,
        }
    }
}

/// Bounded poll that waits for the clock to report real time
pub struct TimeSync {
    attempts: u32,
    interval_ms: u32,
}

impl Default for TimeSync {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSync {
    pub const fn new() -> Self {
        Self {
            attempts: SYNC_POLL_ATTEMPTS,
            interval_ms: SYNC_POLL_INTERVAL_MS,
        }
    }

    pub async fn sync<C, D>(&self, clock: &mut C, delay: &mut D) -> TimeSyncOutcome
    where
        C: NetworkClock,
        D: DelayNs,
    {
        if let Err(e) = clock.start_sync().await {
            warn!("Time sync: {}", e);
            return TimeSyncOutcome::Failed;
        }

        for attempt in 1..=self.attempts {
            let now = clock.now_unix();
            if now > PLAUSIBLE_EPOCH_SECS {
                info!("Time synced after {} poll(s): {}", attempt, now);
                return TimeSyncOutcome::Synced(Timestamp::from_unix_secs(now));
            }
            debug!("Time sync poll {}/{}: clock at {}", attempt, self.attempts, now);

            if attempt < self.attempts {
                delay.delay_ms(self.interval_ms).await;
            }
        }

        warn!("Time sync failed after {} polls", self.attempts);
        TimeSyncOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    /// Clock that becomes plausible after `ready_after` reads
    struct FakeClock {
        reads: u32,
        ready_after: Option<u32>,
        start_fails: bool,
    }

    impl FakeClock {
        fn ready_after(reads: u32) -> Self {
            Self { reads: 0, ready_after: Some(reads), start_fails: false }
        }

        fn never() -> Self {
            Self { reads: 0, ready_after: None, start_fails: false }
        }
    }

    impl NetworkClock for FakeClock {
        async fn start_sync(&mut self) -> Result<(), ClockError> {
            if self.start_fails {
                Err(ClockError::StartFailed)
            } else {
                Ok(())
            }
        }

        fn now_unix(&mut self) -> u64 {
            self.reads += 1;
            match self.ready_after {
                Some(n) if self.reads >= n => 1_760_000_000,
                _ => u64::from(self.reads) * 2,
            }
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ms: u64,
        calls: u32,
    }

    impl DelayNs for CountingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ms += u64::from(ns) / 1_000_000;
            self.calls += 1;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.total_ms += u64::from(ms);
            self.calls += 1;
        }
    }

    #[test]
    fn synced_on_first_plausible_reading() {
        let mut clock = FakeClock::ready_after(3);
        let mut delay = CountingDelay::default();

        let outcome = block_on(TimeSync::new().sync(&mut clock, &mut delay));
        assert_eq!(outcome, TimeSyncOutcome::Synced(Timestamp::from_unix_secs(1_760_000_000)));
        assert_eq!(clock.reads, 3);
        assert_eq!(delay.calls, 2);
        assert_eq!(delay.total_ms, 1000);
    }

    #[test]
    fn gives_up_after_twenty_polls() {
        let mut clock = FakeClock::never();
        let mut delay = CountingDelay::default();

        let outcome = block_on(TimeSync::new().sync(&mut clock, &mut delay));
        assert_eq!(outcome, TimeSyncOutcome::Failed);
        assert_eq!(clock.reads, SYNC_POLL_ATTEMPTS);
        // No trailing delay after the last poll: ~10s of waiting in total
        assert_eq!(delay.total_ms, 19 * 500);
    }

    #[test]
    fn threshold_itself_is_not_plausible() {
        struct Stuck;
        impl NetworkClock for Stuck {
            async fn start_sync(&mut self) -> Result<(), ClockError> {
                Ok(())
            }
            fn now_unix(&mut self) -> u64 {
                PLAUSIBLE_EPOCH_SECS
            }
        }

        let outcome = block_on(TimeSync::new().sync(&mut Stuck, &mut CountingDelay::default()));
        assert_eq!(outcome, TimeSyncOutcome::Failed);
    }

    #[test]
    fn start_failure_is_failed_without_polling() {
        let mut clock = FakeClock::ready_after(1);
        clock.start_fails = true;
        let mut delay = CountingDelay::default();

        let outcome = block_on(TimeSync::new().sync(&mut clock, &mut delay));
        assert_eq!(outcome, TimeSyncOutcome::Failed);
        assert_eq!(clock.reads, 0);
        assert_eq!(delay.calls, 0);
    }

    #[test]
    fn local_time_applies_offset() {
        // 2025-01-01T23:30:00Z
        let ts = Timestamp::from_unix_secs(1_735_774_200);
        assert_eq!(ts.local_hour(0), 23);
        assert_eq!(ts.local_minute(0), 30);
        assert_eq!(ts.local_hour(120), 1);
        assert_eq!(ts.local_hour(-300), 18);
        assert_eq!(alloc::format!("{}", ts.local_clock(120)), "01:30");
    }

    #[test]
    fn ntp_seconds_convert_to_unix() {
        // 2024-01-01T00:00:00Z
        let ntp = (1_704_067_200 + NTP_UNIX_OFFSET) as u32;
        assert_eq!(Timestamp::from_ntp_seconds(ntp), Some(Timestamp::from_unix_secs(1_704_067_200)));
        assert_eq!(Timestamp::from_ntp_seconds(0), None);
    }
}
