//! Drawing of view models onto a monochrome panel
//!
//! Every [`ViewModel`] maps to one [`Screen`]. Screens borrow the view they
//! draw and render onto any `DrawTarget<Color = BinaryColor>` of
//! [`DISPLAY_WIDTH_PX`] x [`DISPLAY_HEIGHT_PX`] pixels. `BinaryColor::On` is
//! ink (black on the e-paper panel), `Off` is paper.
//!
//! [`ScreenWrapper`] is the enum used to hold any of the concrete screens
//! without trait objects.

mod day_detail;
mod error;
mod framebuffer;
pub mod icons;
mod night_split;
mod no_wifi;

pub use day_detail::DayDetailScreen;
pub use error::ErrorScreen;
pub use framebuffer::FrameBuffer;
pub use night_split::NightSplitScreen;
pub use no_wifi::NoWifiScreen;

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::render::ViewModel;

/// Panel width in landscape orientation
pub const DISPLAY_WIDTH_PX: u32 = 250;
/// Panel height in landscape orientation
pub const DISPLAY_HEIGHT_PX: u32 = 122;

/// Height of the header band including its divider
pub const HEADER_HEIGHT_PX: u32 = 19;

pub const INK: BinaryColor = BinaryColor::On;
pub const PAPER: BinaryColor = BinaryColor::Off;

/// A full-screen presentation of one view
pub trait Screen {
    /// Short name for logs
    fn title(&self) -> &str;

    fn draw<D: DrawTarget<Color = BinaryColor>>(&self, display: &mut D) -> Result<(), D::Error>;
}

pub enum ScreenWrapper<'a> {
    NoWifi(NoWifiScreen<'a>),
    Error(ErrorScreen<'a>),
    DayDetail(DayDetailScreen<'a>),
    NightSplit(NightSplitScreen<'a>),
}

impl<'a> From<&'a ViewModel> for ScreenWrapper<'a> {
    fn from(view: &'a ViewModel) -> Self {
        match view {
            ViewModel::NoWifi(v) => Self::NoWifi(NoWifiScreen::new(v)),
            ViewModel::Error(v) => Self::Error(ErrorScreen::new(v)),
            ViewModel::DayDetail(v) => Self::DayDetail(DayDetailScreen::new(v)),
            ViewModel::NightSplit(v) => Self::NightSplit(NightSplitScreen::new(v)),
        }
    }
}

impl Screen for ScreenWrapper<'_> {
    fn title(&self) -> &str {
        match self {
            Self::NoWifi(s) => s.title(),
            Self::Error(s) => s.title(),
            Self::DayDetail(s) => s.title(),
            Self::NightSplit(s) => s.title(),
        }
    }

    fn draw<D: DrawTarget<Color = BinaryColor>>(&self, display: &mut D) -> Result<(), D::Error> {
        match self {
            Self::NoWifi(s) => s.draw(display),
            Self::Error(s) => s.draw(display),
            Self::DayDetail(s) => s.draw(display),
            Self::NightSplit(s) => s.draw(display),
        }
    }
}

/// Clear `display` and draw `view` on it.
pub fn draw_view<D: DrawTarget<Color = BinaryColor>>(
    view: &ViewModel,
    display: &mut D,
) -> Result<(), D::Error> {
    let screen = ScreenWrapper::from(view);
    log::debug!("Drawing screen '{}'", screen.title());
    display.clear(PAPER)?;
    screen.draw(display)
}

pub fn full_screen() -> Rectangle {
    Rectangle::new(
        Point::zero(),
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX),
    )
}

// ---------------------------------------------------------------------------
// Text helpers shared by the screens
// ---------------------------------------------------------------------------

/// Longest prefix of `text` that fits in `max_px` with `font`, cut at a char
/// boundary.
pub(crate) fn fit<'t>(text: &'t str, font: &MonoFont<'_>, max_px: u32) -> &'t str {
    let advance = font.character_size.width + font.character_spacing;
    let max_chars = (max_px / advance.max(1)) as usize;
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Draw `text` with its top-left corner at `origin`.
pub(crate) fn text_at<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    text: &str,
    origin: Point,
    font: &MonoFont<'_>,
) -> Result<(), D::Error> {
    Text::with_baseline(text, origin, MonoTextStyle::new(font, INK), Baseline::Top).draw(display)?;
    Ok(())
}

/// Draw `text` horizontally centered on `center_x`, top edge at `top`.
pub(crate) fn text_centered<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    text: &str,
    center_x: i32,
    top: i32,
    font: &MonoFont<'_>,
) -> Result<(), D::Error> {
    let style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(text, Point::new(center_x, top), MonoTextStyle::new(font, INK), style)
        .draw(display)?;
    Ok(())
}

/// Draw `text` with its top-right corner at `right`, `top`.
pub(crate) fn text_right<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    text: &str,
    right: i32,
    top: i32,
    font: &MonoFont<'_>,
) -> Result<(), D::Error> {
    let style = TextStyleBuilder::new()
        .alignment(Alignment::Right)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(text, Point::new(right, top), MonoTextStyle::new(font, INK), style)
        .draw(display)?;
    Ok(())
}

/// Header band: left title, optional right-aligned stamp, divider below.
pub(crate) fn header<D: DrawTarget<Color = BinaryColor>>(
    display: &mut D,
    title: &str,
    stamp: Option<&str>,
    font: &MonoFont<'_>,
) -> Result<(), D::Error> {
    let right = DISPLAY_WIDTH_PX as i32 - 4;
    let mut room = DISPLAY_WIDTH_PX - 8;

    if let Some(stamp) = stamp {
        text_right(display, stamp, right, 3, font)?;
        let advance = font.character_size.width + font.character_spacing;
        room = room.saturating_sub((stamp.len() as u32 + 1) * advance);
    }
    text_at(display, fit(title, font, room), Point::new(4, 3), font)?;

    let y = HEADER_HEIGHT_PX as i32 - 2;
    Line::new(Point::new(0, y), Point::new(DISPLAY_WIDTH_PX as i32 - 1, y))
        .into_styled(PrimitiveStyle::with_stroke(INK, 1))
        .draw(display)
}
