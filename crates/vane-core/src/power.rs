//! Sleep scheduling and the terminal suspend transition

use log::info;

use crate::config::Settings;

const SECS_PER_HOUR: u64 = 3600;
const MICROS_PER_SEC: u64 = 1_000_000;

/// Exact sleep length for an update interval: `hours × 3600 × 1_000_000`.
pub const fn compute_sleep_microseconds(update_interval_hours: u32) -> u64 {
    update_interval_hours as u64 * SECS_PER_HOUR * MICROS_PER_SEC
}

/// Platform deep-sleep entry.
///
/// `suspend` does not return: the next wake starts over at the boot entry
/// point with only persisted settings surviving.
pub trait DeepSleep {
    fn suspend(&mut self, duration_micros: u64) -> !;
}

pub struct PowerCycleController<P> {
    sleeper: P,
}

impl<P: DeepSleep> PowerCycleController<P> {
    pub fn new(sleeper: P) -> Self {
        Self { sleeper }
    }

    /// Sleep for the configured update interval.
    pub fn suspend_until_next_wake(&mut self, settings: &Settings) -> ! {
        self.suspend_for(compute_sleep_microseconds(settings.update_interval_hours))
    }

    pub fn suspend_for(&mut self, duration_micros: u64) -> ! {
        info!(
            "Entering deep sleep for {}s",
            duration_micros / MICROS_PER_SEC
        );
        self.sleeper.suspend(duration_micros)
    }
}
