use alloc::string::String;

use crate::icons::IconFamily;
use crate::time_sync::Timestamp;

/// Current conditions for one wake.
///
/// `None` means the API did not report the value; it is never replaced by a
/// guessed number.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temp: Option<f32>,
    pub temp_min: Option<f32>,
    pub temp_max: Option<f32>,
    pub feels_like: Option<f32>,
    pub weather_id: Option<i32>,
    pub main: String,
    pub description: String,
    pub icon_code: String,
    /// Synchronized time of the fetch, `None` if time sync failed
    pub timestamp: Option<Timestamp>,
}

impl WeatherSnapshot {
    pub fn icon_family(&self) -> IconFamily {
        IconFamily::resolve(&self.icon_code, self.weather_id, &self.main)
    }
}

/// First forecast period for one wake (night mode only)
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSnapshot {
    pub temp_min: Option<f32>,
    pub temp_max: Option<f32>,
    pub weather_id: Option<i32>,
    pub main: String,
    pub icon_code: String,
}

impl ForecastSnapshot {
    pub fn icon_family(&self) -> IconFamily {
        IconFamily::resolve(&self.icon_code, self.weather_id, &self.main)
    }
}
