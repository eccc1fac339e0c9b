//! Hardware-independent core library for vane-rs
//!
//! This crate contains all platform-agnostic logic for the vane e-paper
//! weather display: the boot → acquire → decide → render → sleep duty cycle,
//! persisted settings, connectivity and provisioning policy, time sync,
//! weather queries, view selection, and page drawing.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).
//! Everything that touches hardware or the network is reached through the
//! collaborator traits defined next to the component that needs them.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod duty_cycle;
pub mod icons;
pub mod mode;
pub mod portal_form;
pub mod power;
pub mod render;
pub mod time_sync;
pub mod weather;

pub use app_state::WakePhase;
pub use config::{Settings, SettingsStorage, SettingsStore, Units};
pub use connectivity::{ConnectivityManager, ConnectivityOutcome, NetworkLink, ProvisioningPortal};
pub use display::{FrameBuffer, draw_view};
pub use duty_cycle::{WakeCycle, WakeReport};
pub use icons::IconFamily;
pub use mode::{Mode, is_night_mode};
pub use power::{DeepSleep, PowerCycleController, compute_sleep_microseconds};
pub use render::{Acquisition, RenderDispatcher, RenderError, Renderer, ViewModel};
pub use time_sync::{NetworkClock, TimeSync, TimeSyncOutcome, Timestamp};
pub use weather::{FetchError, ForecastSnapshot, HttpClient, WeatherClient, WeatherSnapshot};
