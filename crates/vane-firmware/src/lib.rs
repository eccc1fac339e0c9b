//! ESP32-S3 firmware-specific modules for vane-rs
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: flash-backed settings, WiFi station and setup portal, SNTP over
//! the RTC, HTTPS transport, the e-paper panel and deep sleep. Each module
//! implements one of the collaborator traits from `vane_core`.

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod epd;
pub mod flash_settings;
pub mod https;
pub mod portal;
pub mod sleep;
pub mod sntp;
pub mod wifi;
pub mod wifi_secrets;
