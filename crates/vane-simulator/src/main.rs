//! Desktop simulator for the vane-rs e-paper weather display.
//!
//! Runs the real vane-core wake cycle against canned collaborators and shows
//! the resulting screen in an SDL2 window via `embedded-graphics-simulator`.
//! Each key replays one wake with a different network/clock/API situation.
//!
//! # Key bindings
//!
//! | Key | Scenario                                   |
//! |-----|--------------------------------------------|
//! | 1   | Daytime, clear sky                         |
//! | 2   | Night, current + next period               |
//! | 3   | Night, forecast request fails              |
//! | 4   | API rejects the key                        |
//! | 5   | No WiFi, portal times out                  |
//! | 6   | No WiFi, portal form submitted             |
//! | 7   | Clock never syncs                          |
//! | Q   | Quit                                       |

use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{
    BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    sdl2::Keycode,
};
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use vane_core::app_state::FromTruncated;
use vane_core::config::{FieldString, MemoryStorage};
use vane_core::connectivity::{LinkError, PortalError, PortalForm, PortalSubmission};
use vane_core::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use vane_core::render::RenderError;
use vane_core::time_sync::ClockError;
use vane_core::weather::{HttpResponse, TransportError};
use vane_core::{
    ConnectivityManager, FrameBuffer, HttpClient, NetworkClock, NetworkLink, ProvisioningPortal,
    Renderer, Settings, SettingsStore, ViewModel, WakeCycle, WakeReport, draw_view,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 3;

/// Event polling interval.
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Short portal window so the timeout scenario does not stall the window.
const SIM_PORTAL_TIMEOUT: embassy_time::Duration = embassy_time::Duration::from_secs(2);

/// 2025-06-01 12:00 at the default UTC+2 offset
const NOON_UNIX: u64 = 1_748_772_000;
/// 2025-06-01 22:00 at the default UTC+2 offset
const LATE_EVENING_UNIX: u64 = 1_748_808_000;
/// What an unsynced RTC reports a few seconds after boot
const BOOT_CLOCK_SECS: u64 = 4;

const CURRENT_CLEAR: &str = r#"{
  "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
  "main": {"temp": 28.4, "feels_like": 27.9, "temp_min": 26.1, "temp_max": 30.2},
  "name": "Beer Sheva"
}"#;

const CURRENT_NIGHT: &str = r#"{
  "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03n"}],
  "main": {"temp": 21.7, "feels_like": 21.2, "temp_min": 19.8, "temp_max": 23.0}
}"#;

const FORECAST_RAIN: &str = r#"{
  "cnt": 2,
  "list": [
    {"main": {"temp": 19.1, "temp_min": 17.4, "temp_max": 20.6},
     "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10n"}]},
    {"main": {"temp": 18.0, "temp_min": 16.9, "temp_max": 18.8},
     "weather": [{"id": 501, "main": "Rain", "description": "moderate rain", "icon": "10n"}]}
  ]
}"#;

const UNAUTHORIZED: &str = r#"{"cod": 401, "message": "Invalid API key."}"#;
const SERVER_ERROR: &str = r#"{"cod": 500, "message": "Internal error"}"#;

// ---------------------------------------------------------------------------
// Canned collaborators
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum PortalBehaviour {
    /// Nobody joins the access point
    Idle,
    Submit {
        api_key: &'static str,
        city: &'static str,
    },
}

#[derive(Clone, Copy)]
struct Scenario {
    name: &'static str,
    link_up: bool,
    portal: PortalBehaviour,
    clock_secs: u64,
    current: (u16, &'static str),
    forecast: (u16, &'static str),
}

const SCENARIOS: [Scenario; 7] = [
    Scenario {
        name: "Daytime, clear sky",
        link_up: true,
        portal: PortalBehaviour::Idle,
        clock_secs: NOON_UNIX,
        current: (200, CURRENT_CLEAR),
        forecast: (200, FORECAST_RAIN),
    },
    Scenario {
        name: "Night, current + next period",
        link_up: true,
        portal: PortalBehaviour::Idle,
        clock_secs: LATE_EVENING_UNIX,
        current: (200, CURRENT_NIGHT),
        forecast: (200, FORECAST_RAIN),
    },
    Scenario {
        name: "Night, forecast request fails",
        link_up: true,
        portal: PortalBehaviour::Idle,
        clock_secs: LATE_EVENING_UNIX,
        current: (200, CURRENT_NIGHT),
        forecast: (500, SERVER_ERROR),
    },
    Scenario {
        name: "API rejects the key",
        link_up: true,
        portal: PortalBehaviour::Idle,
        clock_secs: NOON_UNIX,
        current: (401, UNAUTHORIZED),
        forecast: (401, UNAUTHORIZED),
    },
    Scenario {
        name: "No WiFi, portal times out",
        link_up: false,
        portal: PortalBehaviour::Idle,
        clock_secs: NOON_UNIX,
        current: (200, CURRENT_CLEAR),
        forecast: (200, FORECAST_RAIN),
    },
    Scenario {
        name: "No WiFi, portal form submitted",
        link_up: false,
        portal: PortalBehaviour::Submit {
            api_key: "",
            city: "Tel Aviv,IL",
        },
        clock_secs: NOON_UNIX,
        current: (200, CURRENT_CLEAR),
        forecast: (200, FORECAST_RAIN),
    },
    Scenario {
        name: "Clock never syncs",
        link_up: true,
        portal: PortalBehaviour::Idle,
        clock_secs: BOOT_CLOCK_SECS,
        current: (200, CURRENT_CLEAR),
        forecast: (200, FORECAST_RAIN),
    },
];

struct SimLink {
    up: bool,
}

impl NetworkLink for SimLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        if self.up {
            Ok(())
        } else {
            Err(LinkError::Association)
        }
    }
}

struct SimPortal {
    behaviour: PortalBehaviour,
}

impl ProvisioningPortal for SimPortal {
    async fn serve(&mut self, form: &PortalForm) -> Result<PortalSubmission, PortalError> {
        info!("Portal open, form pre-filled with city '{}'", form.city);
        match self.behaviour {
            PortalBehaviour::Idle => core::future::pending().await,
            PortalBehaviour::Submit { api_key, city } => Ok(PortalSubmission {
                api_key: api_key.into(),
                city: city.into(),
            }),
        }
    }
}

struct SimClock {
    secs: u64,
}

impl NetworkClock for SimClock {
    async fn start_sync(&mut self) -> Result<(), ClockError> {
        Ok(())
    }

    fn now_unix(&mut self) -> u64 {
        self.secs
    }
}

/// Delay that returns at once so the sync poll does not hold the window
struct InstantDelay;

impl DelayNs for InstantDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}

struct CannedApi {
    current: (u16, &'static str),
    forecast: (u16, &'static str),
}

impl HttpClient for CannedApi {
    async fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
        let (status, body) = if url.contains("/forecast") {
            self.forecast
        } else {
            self.current
        };
        Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        })
    }
}

/// Panel stand-in: the same framebuffer path as the device, shown in SDL
struct SimPanel {
    display: SimulatorDisplay<BinaryColor>,
    frame: FrameBuffer,
}

impl Renderer for SimPanel {
    fn present(&mut self, view: &ViewModel) -> Result<(), RenderError> {
        draw_view(view, &mut self.frame).map_err(|_| RenderError::Draw)?;
        self.frame
            .flush(&mut self.display)
            .map_err(|_| RenderError::Draw)
    }
}

// ---------------------------------------------------------------------------
// Wake replay
// ---------------------------------------------------------------------------

fn seeded_settings() -> Settings {
    Settings {
        api_key: FieldString::from_truncated("demo-key"),
        ..Settings::default()
    }
}

fn run_scenario(scenario: &Scenario, panel: &mut SimPanel) -> WakeReport {
    info!("=== {} ===", scenario.name);

    let mut store = SettingsStore::new(MemoryStorage::new());
    if let Err(e) = block_on(store.save(&seeded_settings())) {
        warn!("Could not seed settings: {}", e);
    }

    let mut cycle = WakeCycle::new(
        store,
        ConnectivityManager::new(
            SimLink {
                up: scenario.link_up,
            },
            SimPortal {
                behaviour: scenario.portal,
            },
        ),
        SimClock {
            secs: scenario.clock_secs,
        },
        InstantDelay,
        vane_core::WeatherClient::new(CannedApi {
            current: scenario.current,
            forecast: scenario.forecast,
        }),
        panel,
    )
    .with_portal_timeout(SIM_PORTAL_TIMEOUT);

    block_on(cycle.run())
}

fn log_report(report: &WakeReport) {
    let phases: Vec<&str> = report.phases.iter().map(|p| p.label()).collect();
    info!("Phases: {}", phases.join(" -> "));
    info!(
        "View: {}, mode: {:?}, synced: {:?}",
        report.view.name(),
        report.mode,
        report.synced_at.map(|t| t.as_unix_secs())
    );
    if let Err(e) = report.render {
        warn!("Render failed: {}", e);
    }
    info!(
        "Would deep-sleep for {} h",
        report.sleep_micros / 3_600_000_000
    );
}

/// Map an SDL keycode to a scenario index.
fn keycode_to_scenario(keycode: Keycode) -> Option<usize> {
    match keycode {
        Keycode::Num1 | Keycode::Kp1 => Some(0),
        Keycode::Num2 | Keycode::Kp2 => Some(1),
        Keycode::Num3 | Keycode::Kp3 => Some(2),
        Keycode::Num4 | Keycode::Kp4 => Some(3),
        Keycode::Num5 | Keycode::Kp5 => Some(4),
        Keycode::Num6 | Keycode::Kp6 => Some(5),
        Keycode::Num7 | Keycode::Kp7 => Some(6),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting vane-rs simulator");
    info!(
        "Display: {}×{} (scale {}×)",
        DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX, WINDOW_SCALE
    );
    info!("Keys: 1-7 replay a wake scenario, Q=Quit");

    let mut panel = SimPanel {
        display: SimulatorDisplay::new(Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)),
        frame: FrameBuffer::new(),
    };

    let output_settings = OutputSettingsBuilder::new()
        .scale(WINDOW_SCALE)
        .theme(BinaryColorTheme::LcdWhite)
        .build();
    let mut window = Window::new("Vane Simulator", &output_settings);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    log_report(&run_scenario(&SCENARIOS[0], &mut panel));
    window.update(&panel.display);

    'running: loop {
        let frame_start = Instant::now();

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown { keycode, .. } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }

                    if let Some(index) = keycode_to_scenario(keycode) {
                        log_report(&run_scenario(&SCENARIOS[index], &mut panel));
                    }
                }

                _ => {}
            }
        }

        window.update(&panel.display);

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    info!("Simulator exiting");
}
