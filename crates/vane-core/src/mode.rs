//! Day/night presentation mode

use crate::config::Settings;
use crate::time_sync::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Day,
    Night,
}

impl Mode {
    /// Select the mode for this wake.
    ///
    /// Without a synchronized clock the local hour is unknown and the device
    /// stays in day mode.
    pub fn select(now: Option<Timestamp>, settings: &Settings) -> Self {
        match now {
            Some(ts) => {
                let hour = ts.local_hour(settings.utc_offset_minutes);
                if is_night_mode(hour, settings.night_start_hour, settings.night_end_hour) {
                    Self::Night
                } else {
                    Self::Day
                }
            }
            None => Self::Day,
        }
    }
}

/// Whether `now_hour` falls in the night window.
///
/// Start is inclusive and end exclusive. A window with `start > end` wraps
/// past midnight; `start == end` is an empty window.
pub const fn is_night_mode(now_hour: u8, start_hour: u8, end_hour: u8) -> bool {
    if start_hour > end_hour {
        now_hour >= start_hour || now_hour < end_hour
    } else {
        start_hour <= now_hour && now_hour < end_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustive_against_both_formulas() {
        for start in 0..24u8 {
            for end in 0..24u8 {
                for hour in 0..24u8 {
                    let expected = if start > end {
                        hour >= start || hour < end
                    } else {
                        start <= hour && hour < end
                    };
                    assert_eq!(
                        is_night_mode(hour, start, end),
                        expected,
                        "start={start} end={end} hour={hour}"
                    );
                }
            }
        }
    }

    #[test]
    fn boundaries_start_inclusive_end_exclusive() {
        for start in 0..24u8 {
            for end in 0..24u8 {
                if start == end {
                    continue;
                }
                assert!(is_night_mode(start, start, end), "start={start} end={end}");
                assert!(!is_night_mode(end, start, end), "start={start} end={end}");
            }
        }
    }

    #[test]
    fn default_window_wraps_midnight() {
        assert!(is_night_mode(20, 20, 7));
        assert!(is_night_mode(23, 20, 7));
        assert!(is_night_mode(0, 20, 7));
        assert!(is_night_mode(6, 20, 7));
        assert!(!is_night_mode(7, 20, 7));
        assert!(!is_night_mode(12, 20, 7));
        assert!(!is_night_mode(19, 20, 7));
    }

    #[test]
    fn unknown_time_selects_day() {
        assert_eq!(Mode::select(None, &Settings::default()), Mode::Day);
    }

    #[test]
    fn select_uses_local_hour() {
        let mut settings = Settings::default();
        settings.utc_offset_minutes = 120;
        // 18:30 UTC is 20:30 local, inside the default 20-7 window
        let ts = Timestamp::from_unix_secs(1_735_689_600 + 18 * 3600 + 1800);
        assert_eq!(Mode::select(Some(ts), &settings), Mode::Night);

        settings.utc_offset_minutes = 0;
        assert_eq!(Mode::select(Some(ts), &settings), Mode::Day);
    }
}
