//! 1-bit framebuffer for the e-paper panel.
//!
//! Screens draw into this RAM buffer first. The whole frame is then pushed to
//! the panel (or the simulator window) in one `fill_contiguous` call, since an
//! e-paper refresh always redraws the full panel anyway.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, PAPER};

/// Bytes per packed row (250 px → 32 bytes, last 6 bits unused)
const STRIDE: usize = (DISPLAY_WIDTH_PX as usize).div_ceil(8);

/// Packed monochrome framebuffer implementing `DrawTarget<Color = BinaryColor>`.
///
/// One bit per pixel, MSB first within each byte, set bits are ink.
pub struct FrameBuffer {
    bits: Vec<u8>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Allocate a blank (all paper) framebuffer.
    pub fn new() -> Self {
        Self {
            bits: vec![0; STRIDE * DISPLAY_HEIGHT_PX as usize],
        }
    }

    #[inline]
    fn index(x: u32, y: u32) -> (usize, u8) {
        let idx = y as usize * STRIDE + x as usize / 8;
        (idx, 0x80 >> (x % 8))
    }

    #[inline]
    fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        let (idx, mask) = Self::index(x, y);
        if color.is_on() {
            self.bits[idx] |= mask;
        } else {
            self.bits[idx] &= !mask;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> BinaryColor {
        if x >= DISPLAY_WIDTH_PX || y >= DISPLAY_HEIGHT_PX {
            return PAPER;
        }
        let (idx, mask) = Self::index(x, y);
        BinaryColor::from(self.bits[idx] & mask != 0)
    }

    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        self.pixel(x, y).is_on()
    }

    /// Number of inked pixels
    pub fn ink_count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    /// Smallest rectangle containing every inked pixel
    pub fn ink_bounds(&self) -> Option<Rectangle> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..DISPLAY_HEIGHT_PX {
            for x in 0..DISPLAY_WIDTH_PX {
                if !self.is_ink(x, y) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }

        bounds.map(|(x0, y0, x1, y1)| {
            Rectangle::with_corners(
                Point::new(x0 as i32, y0 as i32),
                Point::new(x1 as i32, y1 as i32),
            )
        })
    }

    /// Push the whole frame to a display.
    pub fn flush<D>(&self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        debug!(
            "Flushing {}x{} frame ({} ink pixels)",
            DISPLAY_WIDTH_PX,
            DISPLAY_HEIGHT_PX,
            self.ink_count()
        );

        let area = Rectangle::new(Point::zero(), self.size());
        let colors = (0..DISPLAY_HEIGHT_PX)
            .flat_map(move |y| (0..DISPLAY_WIDTH_PX).map(move |x| self.pixel(x, y)));

        display.fill_contiguous(&area, colors)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if let Ok((x, y)) = <(u32, u32)>::try_from(coord)
                && x < DISPLAY_WIDTH_PX
                && y < DISPLAY_HEIGHT_PX
            {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x as u32, y as u32, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = if color.is_on() { 0xFF } else { 0x00 };
        self.bits.fill(fill);
        Ok(())
    }
}
