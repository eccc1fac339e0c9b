//! View selection and handoff to the rendering collaborator
//!
//! The dispatcher turns what happened during the wake (connectivity, mode,
//! fetch results) into exactly one fully populated [`ViewModel`]:
//!
//! | Connectivity  | Mode  | Current | Forecast | View             |
//! |---------------|-------|---------|----------|------------------|
//! | portal timeout| any   | -       | -        | `NoWifi`         |
//! | connected     | day   | ok      | -        | `DayDetail`      |
//! | connected     | day   | err     | -        | `Error`          |
//! | connected     | night | ok      | ok       | `NightSplit`     |
//! | connected     | night | ok      | err      | `DayDetail`      |
//! | connected     | night | err     | any      | `Error`          |

use core::fmt::Write as _;

use alloc::string::String;
use log::{error, info};
use thiserror_no_std::Error;

use crate::config::{FieldString, Settings, Units};
use crate::connectivity::PORTAL_AP_NAME;
use crate::icons::IconFamily;
use crate::time_sync::ClockTime;
use crate::weather::{FetchError, ForecastSnapshot, WeatherSnapshot};

/// User-facing text for every fetch failure
pub const ERROR_TEXT: &str = "Weather ERR";

/// User-facing text when the portal timed out
pub const NO_WIFI_TEXT: &str = "No WiFi";

/// Condition line shown when the API sent an empty `main`
const FALLBACK_CONDITION: &str = "Weather";

/// Placeholder for an unknown temperature
const UNKNOWN_TEMPERATURE: &str = "--.-";

/// Placeholder for an unknown update time
pub const UNKNOWN_CLOCK: &str = "--:--";

#[derive(Debug, Clone, PartialEq)]
pub struct NoWifiView {
    pub city: FieldString,
    pub message: &'static str,
    /// Access point to join for setup
    pub portal_ap: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorView {
    pub city: FieldString,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayDetailView {
    pub city: FieldString,
    pub temp: Option<f32>,
    pub temp_min: Option<f32>,
    pub temp_max: Option<f32>,
    pub feels_like: Option<f32>,
    pub condition: String,
    pub description: String,
    pub icon: IconFamily,
    pub units: Units,
    pub updated: Option<ClockTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPanel {
    pub temp_min: Option<f32>,
    pub temp_max: Option<f32>,
    pub condition: String,
    pub icon: IconFamily,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NightSplitView {
    pub current: DayDetailView,
    pub next: ForecastPanel,
}

/// The single presentation chosen for a wake
#[derive(Debug, Clone, PartialEq)]
pub enum ViewModel {
    NoWifi(NoWifiView),
    Error(ErrorView),
    DayDetail(DayDetailView),
    NightSplit(NightSplitView),
}

impl ViewModel {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoWifi(_) => "NoWifiView",
            Self::Error(_) => "ErrorView",
            Self::DayDetail(_) => "DayDetailView",
            Self::NightSplit(_) => "NightSplitView",
        }
    }
}

/// Everything the wake acquired, by presentation mode
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    /// Portal timed out; nothing else ran
    NoConnectivity,
    Day {
        current: Result<WeatherSnapshot, FetchError>,
    },
    Night {
        current: Result<WeatherSnapshot, FetchError>,
        forecast: Result<ForecastSnapshot, FetchError>,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    #[error("drawing failed")]
    Draw,
    #[error("display panel did not respond")]
    Panel,
}

/// Rendering collaborator that puts a view on the physical display
pub trait Renderer {
    fn present(&mut self, view: &ViewModel) -> Result<(), RenderError>;
}

impl<T: Renderer> Renderer for &mut T {
    fn present(&mut self, view: &ViewModel) -> Result<(), RenderError> {
        (**self).present(view)
    }
}

/// A panel that failed to come up reports [`RenderError::Panel`] on every
/// present, so the wake still runs to sleep.
impl<T: Renderer> Renderer for Option<T> {
    fn present(&mut self, view: &ViewModel) -> Result<(), RenderError> {
        match self {
            Some(renderer) => renderer.present(view),
            None => Err(RenderError::Panel),
        }
    }
}

pub struct RenderDispatcher;

impl RenderDispatcher {
    /// Apply the decision table.
    pub fn dispatch(settings: &Settings, acquisition: Acquisition) -> ViewModel {
        match acquisition {
            Acquisition::NoConnectivity => ViewModel::NoWifi(NoWifiView {
                city: settings.city.clone(),
                message: NO_WIFI_TEXT,
                portal_ap: PORTAL_AP_NAME,
            }),
            Acquisition::Day { current: Ok(current) } => {
                ViewModel::DayDetail(day_detail(settings, &current))
            }
            Acquisition::Night {
                current: Ok(current),
                forecast: Ok(forecast),
            } => ViewModel::NightSplit(NightSplitView {
                current: day_detail(settings, &current),
                next: ForecastPanel {
                    temp_min: forecast.temp_min,
                    temp_max: forecast.temp_max,
                    condition: condition_text(&forecast.main),
                    icon: forecast.icon_family(),
                },
            }),
            Acquisition::Night {
                current: Ok(current),
                forecast: Err(e),
            } => {
                info!("Forecast unavailable ({}), falling back to day view", e);
                ViewModel::DayDetail(day_detail(settings, &current))
            }
            Acquisition::Day { current: Err(e) } | Acquisition::Night { current: Err(e), .. } => {
                error!("Weather fetch failed: {}", e);
                ViewModel::Error(ErrorView {
                    city: settings.city.clone(),
                    message: ERROR_TEXT,
                })
            }
        }
    }

    /// Hand the view to the renderer once. Failures are logged, not retried.
    pub fn present<R: Renderer>(renderer: &mut R, view: &ViewModel) -> Result<(), RenderError> {
        info!("Rendering {}", view.name());
        renderer.present(view).inspect_err(|e| error!("Render failed: {}", e))
    }
}

fn day_detail(settings: &Settings, current: &WeatherSnapshot) -> DayDetailView {
    DayDetailView {
        city: settings.city.clone(),
        temp: current.temp,
        temp_min: current.temp_min,
        temp_max: current.temp_max,
        feels_like: current.feels_like,
        condition: condition_text(&current.main),
        description: current.description.clone(),
        icon: current.icon_family(),
        units: settings.units,
        updated: current
            .timestamp
            .map(|ts| ts.local_clock(settings.utc_offset_minutes)),
    }
}

fn condition_text(main: &str) -> String {
    if main.is_empty() {
        FALLBACK_CONDITION.into()
    } else {
        main.into()
    }
}

/// Format a temperature with one decimal and the unit letter, e.g. `-3.5C`.
/// Unknown values print as `--.-C`.
pub fn format_temperature(value: Option<f32>, units: Units) -> String {
    let mut out = String::new();
    let _ = match value {
        Some(v) => write!(out, "{:.1}{}", v, units.temperature_suffix()),
        None => write!(out, "{}{}", UNKNOWN_TEMPERATURE, units.temperature_suffix()),
    };
    out
}

/// Format an update stamp, `--:--` when time sync failed
pub fn format_clock(clock: Option<ClockTime>) -> String {
    let mut out = String::new();
    let _ = match clock {
        Some(c) => write!(out, "{}", c),
        None => write!(out, "{}", UNKNOWN_CLOCK),
    };
    out
}
