//! Timer-woken deep sleep through the RTC

use core::time::Duration;

use esp_hal::peripherals::LPWR;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use vane_core::config::DEFAULT_UPDATE_INTERVAL_HOURS;
use vane_core::power::{DeepSleep, compute_sleep_microseconds};

use crate::sntp::SharedRtc;

pub struct RtcDeepSleep {
    rtc: &'static SharedRtc,
}

impl RtcDeepSleep {
    pub fn new(rtc: &'static SharedRtc) -> Self {
        Self { rtc }
    }
}

impl DeepSleep for RtcDeepSleep {
    fn suspend(&mut self, duration_micros: u64) -> ! {
        let timer = TimerWakeupSource::new(Duration::from_micros(duration_micros));
        self.rtc.borrow_mut().sleep_deep(&[&timer])
    }
}

/// Last resort for the panic handler: sleep for the default interval so the
/// next wake starts over.
pub fn sleep_after_panic() -> ! {
    // SAFETY: nothing else runs after a panic, so the shared RTC is never
    // touched again.
    let mut rtc = Rtc::new(unsafe { LPWR::steal() });
    let timer = TimerWakeupSource::new(Duration::from_micros(compute_sleep_microseconds(
        DEFAULT_UPDATE_INTERVAL_HOURS,
    )));
    rtc.sleep_deep(&[&timer])
}
