//! Night split screen: current conditions left, next forecast period right

use alloc::string::String;
use embedded_graphics::{
    mono_font::ascii::{FONT_6X10, FONT_7X13_BOLD, FONT_9X15_BOLD},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};

use super::icons::{ICON_WIDTH, draw_icon};
use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, HEADER_HEIGHT_PX, INK, Screen, fit, header, text_at, text_centered};
use crate::config::Units;
use crate::icons::IconFamily;
use crate::render::{NightSplitView, format_clock, format_temperature};

const PANEL_WIDTH_PX: u32 = DISPLAY_WIDTH_PX / 2;

/// What one half of the screen shows
struct Panel<'v> {
    label: &'static str,
    headline: Option<f32>,
    low: Option<f32>,
    high: Option<f32>,
    condition: &'v str,
    icon: IconFamily,
}

pub struct NightSplitScreen<'a> {
    view: &'a NightSplitView,
}

impl<'a> NightSplitScreen<'a> {
    pub fn new(view: &'a NightSplitView) -> Self {
        Self { view }
    }

    fn draw_panel<D: DrawTarget<Color = BinaryColor>>(
        display: &mut D,
        x0: i32,
        panel: &Panel<'_>,
        units: Units,
    ) -> Result<(), D::Error> {
        let top = HEADER_HEIGHT_PX as i32 + 2;
        let center = x0 + (PANEL_WIDTH_PX / 2) as i32;

        text_at(display, panel.label, Point::new(x0 + 4, top), &FONT_6X10)?;
        text_at(
            display,
            &format_temperature(panel.headline, units),
            Point::new(x0 + 4, top + 13),
            &FONT_9X15_BOLD,
        )?;

        let icon_x = x0 + (PANEL_WIDTH_PX - ICON_WIDTH) as i32 - 3;
        draw_icon(display, panel.icon, Point::new(icon_x, top))?;

        text_centered(
            display,
            fit(panel.condition, &FONT_7X13_BOLD, PANEL_WIDTH_PX - 8),
            center,
            84,
            &FONT_7X13_BOLD,
        )?;

        let mut range = String::from("L ");
        range.push_str(&format_temperature(panel.low, units));
        range.push_str(" H ");
        range.push_str(&format_temperature(panel.high, units));
        text_centered(display, &range, center, 104, &FONT_6X10)
    }
}

impl Screen for NightSplitScreen<'_> {
    fn title(&self) -> &str {
        "Night split"
    }

    fn draw<D: DrawTarget<Color = BinaryColor>>(&self, display: &mut D) -> Result<(), D::Error> {
        let now = &self.view.current;
        let next = &self.view.next;

        let mut title = String::from("Tonight: ");
        title.push_str(&now.city);
        let stamp = format_clock(now.updated);
        header(display, &title, Some(&stamp), &FONT_7X13_BOLD)?;

        let divider_x = PANEL_WIDTH_PX as i32;
        Line::new(
            Point::new(divider_x, HEADER_HEIGHT_PX as i32),
            Point::new(divider_x, DISPLAY_HEIGHT_PX as i32 - 1),
        )
        .into_styled(PrimitiveStyle::with_stroke(INK, 1))
        .draw(display)?;

        Self::draw_panel(
            display,
            0,
            &Panel {
                label: "Now",
                headline: now.temp,
                low: now.temp_min,
                high: now.temp_max,
                condition: &now.condition,
                icon: now.icon,
            },
            now.units,
        )?;

        Self::draw_panel(
            display,
            divider_x + 1,
            &Panel {
                label: "Next",
                headline: next.temp_max,
                low: next.temp_min,
                high: next.temp_max,
                condition: &next.condition,
                icon: next.icon,
            },
            now.units,
        )
    }
}
