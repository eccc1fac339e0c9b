//! 2.13" black/white e-paper panel
//!
//! Views are drawn into the core [`FrameBuffer`] at 250x122 and copied into
//! the driver's buffer, which is rotated 90° to match the landscape layout.
//! The panel is put to sleep after every refresh; the next refresh comes
//! after a reboot anyway.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use epd_waveshare::epd2in13_v2::{Display2in13, Epd2in13};
use epd_waveshare::prelude::*;
use log::{error, info};
use vane_core::display::{FrameBuffer, draw_view};
use vane_core::render::{RenderError, Renderer, ViewModel};

pub struct EpdRenderer<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    spi: SPI,
    epd: Epd2in13<SPI, BUSY, DC, RST, DELAY>,
    delay: DELAY,
    panel: Display2in13,
    frame: FrameBuffer,
}

impl<SPI, BUSY, DC, RST, DELAY> EpdRenderer<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Reset and initialize the panel controller.
    pub fn new(mut spi: SPI, busy: BUSY, dc: DC, rst: RST, mut delay: DELAY) -> Result<Self, RenderError> {
        let epd = Epd2in13::new(&mut spi, busy, dc, rst, &mut delay, None).map_err(|e| {
            error!("E-paper init failed: {:?}", e);
            RenderError::Panel
        })?;

        let mut panel = Display2in13::default();
        panel.set_rotation(DisplayRotation::Rotate90);

        Ok(Self {
            spi,
            epd,
            delay,
            panel,
            frame: FrameBuffer::new(),
        })
    }
}

impl<SPI, BUSY, DC, RST, DELAY> Renderer for EpdRenderer<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn present(&mut self, view: &ViewModel) -> Result<(), RenderError> {
        draw_view(view, &mut self.frame).map_err(|_| RenderError::Draw)?;
        self.frame
            .flush(&mut self.panel.color_converted::<BinaryColor>())
            .map_err(|_| RenderError::Draw)?;

        self.epd
            .update_and_display_frame(&mut self.spi, self.panel.buffer(), &mut self.delay)
            .map_err(|e| {
                error!("E-paper refresh failed: {:?}", e);
                RenderError::Panel
            })?;
        info!("E-paper refreshed with {}", view.name());

        self.epd.sleep(&mut self.spi, &mut self.delay).map_err(|e| {
            error!("E-paper sleep failed: {:?}", e);
            RenderError::Panel
        })
    }
}
