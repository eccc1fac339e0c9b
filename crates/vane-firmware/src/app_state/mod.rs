//! Firmware-specific application state extensions
//!
//! Re-exports the hardware-independent app state from `vane_core` and
//! adds the ESP32-S3 board bring-up.

mod hardware;

pub use hardware::*;

// Re-export all shared app state types from vane-core
pub use vane_core::app_state::*;
