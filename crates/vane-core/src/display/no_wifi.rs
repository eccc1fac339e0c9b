//! No WiFi screen
//!
//! Shown when the setup portal timed out. Tells the user which access point
//! to join on the next wake.

use alloc::string::String;
use embedded_graphics::{
    mono_font::ascii::{FONT_6X10, FONT_10X20},
    pixelcolor::BinaryColor,
    prelude::*,
};

use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, Screen, fit, text_centered};
use crate::render::NoWifiView;

const LINE_GAP_PX: i32 = 4;

pub struct NoWifiScreen<'a> {
    view: &'a NoWifiView,
}

impl<'a> NoWifiScreen<'a> {
    pub fn new(view: &'a NoWifiView) -> Self {
        Self { view }
    }
}

impl Screen for NoWifiScreen<'_> {
    fn title(&self) -> &str {
        "No WiFi"
    }

    fn draw<D: DrawTarget<Color = BinaryColor>>(&self, display: &mut D) -> Result<(), D::Error> {
        let center_x = (DISPLAY_WIDTH_PX / 2) as i32;
        let big = FONT_10X20.character_size.height as i32;
        let small = FONT_6X10.character_size.height as i32;

        // Message block: big line then two help lines, vertically centered
        let block = big + 2 * (small + LINE_GAP_PX);
        let mut y = (DISPLAY_HEIGHT_PX as i32 - block) / 2;

        text_centered(display, self.view.message, center_x, y, &FONT_10X20)?;
        y += big + LINE_GAP_PX;

        let mut join = String::from("Join WiFi ");
        join.push_str(self.view.portal_ap);
        text_centered(display, &join, center_x, y, &FONT_6X10)?;
        y += small + LINE_GAP_PX;

        let city = fit(&self.view.city, &FONT_6X10, DISPLAY_WIDTH_PX - 8);
        text_centered(display, city, center_x, y, &FONT_6X10)
    }
}
