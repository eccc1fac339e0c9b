//! Day detail screen: current conditions with icon and min/max row

use alloc::string::String;
use embedded_graphics::{
    mono_font::ascii::{FONT_6X10, FONT_7X13_BOLD, FONT_9X15_BOLD, FONT_10X20},
    pixelcolor::BinaryColor,
    prelude::*,
};

use super::icons::{ICON_WIDTH, draw_icon};
use super::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, HEADER_HEIGHT_PX, Screen, fit, header, text_at, text_centered};
use crate::render::{DayDetailView, format_clock, format_temperature};

/// Left edge of the icon box
const ICON_X: i32 = (DISPLAY_WIDTH_PX - ICON_WIDTH) as i32 - 4;
/// Width of the text column left of the icon
const TEXT_COLUMN_PX: u32 = ICON_X as u32 - 4;
const MIN_MAX_TOP: i32 = DISPLAY_HEIGHT_PX as i32 - 17;

pub struct DayDetailScreen<'a> {
    view: &'a DayDetailView,
}

impl<'a> DayDetailScreen<'a> {
    pub fn new(view: &'a DayDetailView) -> Self {
        Self { view }
    }
}

impl Screen for DayDetailScreen<'_> {
    fn title(&self) -> &str {
        "Day detail"
    }

    fn draw<D: DrawTarget<Color = BinaryColor>>(&self, display: &mut D) -> Result<(), D::Error> {
        let v = self.view;

        let mut title = String::from("Today: ");
        title.push_str(&v.city);
        let stamp = format_clock(v.updated);
        header(display, &title, Some(&stamp), &FONT_7X13_BOLD)?;

        draw_icon(display, v.icon, Point::new(ICON_X, HEADER_HEIGHT_PX as i32 + 3))?;

        let column_center = (TEXT_COLUMN_PX / 2) as i32;
        text_centered(
            display,
            &format_temperature(v.temp, v.units),
            column_center,
            HEADER_HEIGHT_PX as i32 + 8,
            &FONT_10X20,
        )?;

        let mut feels = String::from("Feels ");
        feels.push_str(&format_temperature(v.feels_like, v.units));
        text_centered(display, &feels, column_center, 50, &FONT_6X10)?;

        text_centered(
            display,
            fit(&v.condition, &FONT_9X15_BOLD, TEXT_COLUMN_PX),
            column_center,
            64,
            &FONT_9X15_BOLD,
        )?;

        text_centered(
            display,
            fit(&v.description, &FONT_6X10, DISPLAY_WIDTH_PX - 8),
            (DISPLAY_WIDTH_PX / 2) as i32,
            88,
            &FONT_6X10,
        )?;

        let mut min = String::from("Min: ");
        min.push_str(&format_temperature(v.temp_min, v.units));
        text_at(display, &min, Point::new(6, MIN_MAX_TOP), &FONT_7X13_BOLD)?;

        let mut max = String::from("Max: ");
        max.push_str(&format_temperature(v.temp_max, v.units));
        text_at(display, &max, Point::new(130, MIN_MAX_TOP), &FONT_7X13_BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::FromTruncated;
    use crate::config::{FieldString, Units};
    use crate::display::FrameBuffer;
    use crate::display::icons::ICON_HEIGHT;
    use crate::icons::IconFamily;

    fn view(icon: IconFamily) -> DayDetailView {
        DayDetailView {
            city: FieldString::from_truncated("Llanfairpwllgwyngyllgogerychwyrndrobwllllantysiliogogogoch,GB"),
            temp: None,
            temp_min: None,
            temp_max: None,
            feels_like: None,
            condition: String::from("Weather"),
            description: String::new(),
            icon,
            units: Units::Imperial,
            updated: None,
        }
    }

    fn ink_in_icon_box(fb: &FrameBuffer) -> u32 {
        let mut count = 0;
        for y in HEADER_HEIGHT_PX + 3..HEADER_HEIGHT_PX + 3 + ICON_HEIGHT {
            for x in ICON_X as u32..ICON_X as u32 + ICON_WIDTH {
                count += u32::from(fb.is_ink(x, y));
            }
        }
        count
    }

    #[test]
    fn unknown_values_still_draw_placeholders() {
        let mut fb = FrameBuffer::new();
        DayDetailScreen::new(&view(IconFamily::Mist)).draw(&mut fb).unwrap();

        // Min/max row carries "--.-F" placeholders
        let row_ink = (MIN_MAX_TOP as u32..DISPLAY_HEIGHT_PX)
            .flat_map(|y| (0..DISPLAY_WIDTH_PX).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.is_ink(x, y))
            .count();
        assert!(row_ink > 0);
    }

    #[test]
    fn icon_changes_with_family() {
        let mut clear = FrameBuffer::new();
        DayDetailScreen::new(&view(IconFamily::Clear)).draw(&mut clear).unwrap();
        let mut storm = FrameBuffer::new();
        DayDetailScreen::new(&view(IconFamily::Thunderstorm)).draw(&mut storm).unwrap();

        assert!(ink_in_icon_box(&clear) > 0);
        assert_ne!(ink_in_icon_box(&clear), ink_in_icon_box(&storm));
    }

    #[test]
    fn long_city_is_clipped_before_the_stamp() {
        let mut fb = FrameBuffer::new();
        DayDetailScreen::new(&view(IconFamily::Clouds)).draw(&mut fb).unwrap();

        // Gap column between the clipped title and the right-aligned "--:--"
        let stamp_left = DISPLAY_WIDTH_PX - 4 - 5 * 7;
        let gap_x = stamp_left - 3;
        assert!((0..HEADER_HEIGHT_PX - 3).all(|y| !fb.is_ink(gap_x, y)));
    }
}
