//! Fetch error screen

use embedded_graphics::{
    mono_font::ascii::{FONT_6X10, FONT_7X13_BOLD, FONT_10X20},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};

use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, INK, Screen, header, text_centered};
use crate::render::ErrorView;

pub struct ErrorScreen<'a> {
    view: &'a ErrorView,
}

impl<'a> ErrorScreen<'a> {
    pub fn new(view: &'a ErrorView) -> Self {
        Self { view }
    }
}

impl Screen for ErrorScreen<'_> {
    fn title(&self) -> &str {
        "Error"
    }

    fn draw<D: DrawTarget<Color = BinaryColor>>(&self, display: &mut D) -> Result<(), D::Error> {
        header(display, &self.view.city, None, &FONT_7X13_BOLD)?;

        let center_x = (DISPLAY_WIDTH_PX / 2) as i32;
        let text_h = FONT_10X20.character_size.height as i32;
        let text_w = FONT_10X20.character_size.width as i32 * self.view.message.len() as i32;
        let top = (DISPLAY_HEIGHT_PX as i32 - text_h) / 2;

        // Framed message
        Rectangle::new(
            Point::new(center_x - text_w / 2 - 8, top - 6),
            Size::new(text_w as u32 + 16, text_h as u32 + 12),
        )
        .into_styled(PrimitiveStyle::with_stroke(INK, 2))
        .draw(display)?;
        text_centered(display, self.view.message, center_x, top, &FONT_10X20)?;

        text_centered(
            display,
            "Retrying at next wake",
            center_x,
            DISPLAY_HEIGHT_PX as i32 - FONT_6X10.character_size.height as i32 - 4,
            &FONT_6X10,
        )
    }
}
