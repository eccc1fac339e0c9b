//! Board bring-up for the e-paper panel and the shared peripherals
//!
//! Panel wiring (SPI2):
//!
//! | Signal | GPIO |
//! |--------|------|
//! | SCK    | 12   |
//! | MOSI   | 11   |
//! | CS     | 10   |
//! | DC     | 9    |
//! | RST    | 8    |
//! | BUSY   | 7    |

use core::cell::RefCell;

use embassy_sync::mutex::Mutex;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::Blocking;
use esp_hal::gpio::{AnyPin, Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::peripherals::{FLASH, LPWR, SPI2};
use esp_hal::rtc_cntl::Rtc;
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use log::{error, info};
use static_cell::StaticCell;
use vane_core::render::RenderError;

use crate::epd::EpdRenderer;
use crate::flash_settings::{FlashStore, SharedFlash};
use crate::sntp::SharedRtc;

pub type PanelSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, Delay>;
pub type Panel = EpdRenderer<PanelSpi, Input<'static>, Output<'static>, Output<'static>, Delay>;

const PANEL_SPI_RATE_MHZ: u32 = 4;

pub struct PanelPins {
    pub sck: AnyPin<'static>,
    pub mosi: AnyPin<'static>,
    pub cs: AnyPin<'static>,
    pub dc: AnyPin<'static>,
    pub rst: AnyPin<'static>,
    pub busy: AnyPin<'static>,
}

/// Bring up SPI2 and initialize the panel controller.
pub fn init_panel(spi2: SPI2<'static>, pins: PanelPins) -> Result<Panel, RenderError> {
    let config = SpiConfig::default()
        .with_frequency(Rate::from_mhz(PANEL_SPI_RATE_MHZ))
        .with_mode(Mode::_0);

    let spi_bus = Spi::new(spi2, config)
        .map_err(|e| {
            error!("Panel SPI config rejected: {:?}", e);
            RenderError::Panel
        })?
        .with_sck(pins.sck)
        .with_mosi(pins.mosi);

    let cs = Output::new(pins.cs, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new(spi_bus, cs, Delay).map_err(|_| RenderError::Panel)?;

    let dc = Output::new(pins.dc, Level::Low, OutputConfig::default());
    let rst = Output::new(pins.rst, Level::High, OutputConfig::default());
    let busy = Input::new(pins.busy, InputConfig::default().with_pull(Pull::None));

    let panel = EpdRenderer::new(spi_device, busy, dc, rst, Delay)?;
    info!("E-paper panel initialized");
    Ok(panel)
}

/// Flash shared by the settings and WiFi credential stores
pub fn init_flash(flash: FLASH<'static>) -> &'static SharedFlash {
    static FLASH_STORE: StaticCell<SharedFlash> = StaticCell::new();
    FLASH_STORE.init(Mutex::new(FlashStore::new(flash)))
}

/// RTC shared by the wall clock and deep sleep
pub fn init_rtc(lpwr: LPWR<'static>) -> &'static SharedRtc {
    static RTC: StaticCell<SharedRtc> = StaticCell::new();
    RTC.init(RefCell::new(Rtc::new(lpwr)))
}
